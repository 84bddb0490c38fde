//! DISTO ONLINE Protocol Constants
//!
//! This module defines constants used by the DISTO D8 ONLINE protocol
//! implementation. Values marked as observed come from probing real devices;
//! the protocol itself is only partially documented.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Word indices (first two digits of a measurement token)
// ----------------------------------------------------------------------------

/// Word index of a distance reading (millimeters when the unit code is `00`).
pub const WI_DISTANCE: u8 = 31;

/// Word index of a temperature reading (tenths of a degree Celsius).
pub const WI_TEMPERATURE: u8 = 40;

/// Word index of a signal strength reading (millivolts).
pub const WI_SIGNAL: u8 = 53;

/// The only unit code with a known meaning for distance words (millimeters).
pub const UNIT_MILLIMETERS: &str = "00";

// ----------------------------------------------------------------------------
// Line markers
// ----------------------------------------------------------------------------

/// Prefix of device status and error reports.
pub const STATUS_PREFIX: char = '@';

/// Prefix of device error reports (e.g. `@E203`).
pub const ERROR_PREFIX: &str = "@E";

/// Bare idle/acknowledge marker.
pub const IDLE_MARKER: &str = "?";

// ----------------------------------------------------------------------------
// Acknowledgment sequences
// ----------------------------------------------------------------------------

/// Text confirmation used in push mode.
pub const CONFIRM_SEQUENCE: &[u8] = b"cfm\n";

/// Single-byte ASCII ACK also observed to release push-mode readings.
pub const ACK_BYTE: u8 = 0x06;

// ----------------------------------------------------------------------------
// Serial defaults
// ----------------------------------------------------------------------------

/// Default baud rate of the DISTO serial/SPP link.
pub const DEFAULT_BAUDRATE: u32 = 9600;

/// Per-iteration read timeout of the session worker.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Bytes requested per read call.
pub const DEFAULT_READ_CHUNK: usize = 256;

/// Silence after which the link is reported idle.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Window after our own command during which received distances are not confirmed.
pub const CONFIRM_GRACE_WINDOW: Duration = Duration::from_millis(1000);

/// Longest line the assembler emits; longer lines are split into pieces of this size.
pub const MAX_LINE_LEN: usize = 4096;

// ----------------------------------------------------------------------------
// Streaming detection (observed)
// ----------------------------------------------------------------------------

/// Bytes in one read window that indicate continuous streaming.
pub const STREAMING_BYTE_THRESHOLD: usize = 80;

/// Distance tokens in one read window that indicate continuous streaming.
pub const STREAMING_TOKEN_THRESHOLD: usize = 2;

/// Line terminators in one read window that indicate continuous streaming.
pub const STREAMING_TERMINATOR_THRESHOLD: usize = 2;

/// Default read window of a one-shot probe.
pub const DEFAULT_PROBE_WINDOW: Duration = Duration::from_millis(1200);

/// Read window used to collect the response to a stop sent after streaming was detected.
pub const STREAM_STOP_WINDOW: Duration = Duration::from_millis(600);
