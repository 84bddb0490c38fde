//! # disto-rs - A Rust Crate for the Leica DISTO D8 ONLINE Protocol
//!
//! The disto-rs crate talks to a Leica DISTO D8 laser distance meter over its
//! serial (USB or Bluetooth SPP) link in "ONLINE" mode, a line-oriented ASCII
//! protocol that is only partially documented.
//!
//! ## Features
//!
//! - Decode measurement tokens such as `31..00+0012345` into typed words (distance, temperature, signal)
//! - Reassemble lines from a byte stream with mixed `\r`, `\n` and `\r\n` terminators
//! - Track continuous measurement mode and run client-side averaging captures
//! - Acknowledge push-mode readings (`cfm\n` and/or `0x06`) so the device keeps sending
//! - Serialize commands through one worker that exclusively owns the serial port
//! - Detect runaway streaming after exploratory commands and stop it
//! - Append measurements to a CSV log
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! disto-rs = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use disto_rs::{connect, Command, DistoEvent};
//!
//! # async fn run() -> Result<(), disto_rs::DistoError> {
//! let (mut device, mut events) = connect("/dev/rfcomm0").await?;
//! device.send(Command::measure())?;
//! while let Some(event) = events.recv().await {
//!     if let DistoEvent::Word { word, .. } = &event {
//!         println!("{word}");
//!         break;
//!     }
//! }
//! disto_rs::disconnect(&mut device).await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod datalog;
pub mod disto;
pub mod error;
pub mod logging;
pub mod util;

pub use crate::error::DistoError;
pub use crate::logging::{init_logger, log_info};

// Core DISTO types
pub use datalog::CsvLogger;
pub use disto::{
    parse_token, AckStrategy, Command, ConnectionState, DeviceInfoQuery, DistoDeviceHandle,
    DistoEvent, LineAssembler, LineEnding, MeasurementWord, ProtocolSession, SerialConfig,
    SessionConfig, Sign, StatusKind, WordKind,
};

use tokio::sync::mpsc::UnboundedReceiver;

/// Connect to a DISTO via serial port with default settings.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" or "/dev/rfcomm0" on Linux, "COM7" on Windows)
///
/// # Returns
/// * `Ok((DistoDeviceHandle, events))` - Running session and its event stream
/// * `Err(DistoError)` - The port could not be opened
pub async fn connect(
    port: &str,
) -> Result<(DistoDeviceHandle, UnboundedReceiver<DistoEvent>), DistoError> {
    DistoDeviceHandle::connect(port, &SerialConfig::default(), SessionConfig::default()).await
}

/// Stop a session and close its port.
///
/// # Arguments
/// * `handle` - Handle returned by [`connect`]
///
/// # Returns
/// * `Ok(())` - Session stopped
/// * `Err(DistoError)` - The worker task failed
pub async fn disconnect(handle: &mut DistoDeviceHandle) -> Result<(), DistoError> {
    handle.disconnect().await
}
