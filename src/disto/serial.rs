//! # DISTO Serial Communication
//!
//! This module provides the transport side of a DISTO link: the [`Transport`]
//! trait the session worker is generic over, and the tokio-serial adapter that
//! opens a real port (USB serial or Bluetooth SPP/RFCOMM) with the device's
//! fixed line settings.

use crate::constants::{DEFAULT_BAUDRATE, DEFAULT_READ_TIMEOUT};
use crate::error::DistoError;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: DEFAULT_BAUDRATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A byte-oriented duplex channel to the device, already open.
#[async_trait::async_trait]
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Discards bytes received but not yet read.
    async fn discard_input(&mut self) -> Result<(), io::Error>;
}

#[async_trait::async_trait]
impl Transport for SerialStream {
    async fn discard_input(&mut self) -> Result<(), io::Error> {
        SerialPort::clear(self, tokio_serial::ClearBuffer::Input).map_err(io::Error::from)
    }
}

#[async_trait::async_trait]
impl Transport for crate::disto::serial_mock::MockSerialPort {
    async fn discard_input(&mut self) -> Result<(), io::Error> {
        self.rx_buffer.lock().unwrap().clear();
        Ok(())
    }
}

/// Opens `port_name` with 8 data bits, no parity and one stop bit.
pub fn open_serial(port_name: &str, config: &SerialConfig) -> Result<SerialStream, DistoError> {
    let port = tokio_serial::new(port_name, config.baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(config.timeout)
        .open_native_async()
        .map_err(|e| DistoError::SerialPortError(format!("{port_name}: {e}")))?;
    log::info!("Opened {port_name} @ {}", config.baudrate);
    Ok(port)
}
