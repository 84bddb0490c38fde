//! # DISTO Error Handling
//!
//! This module defines the DistoError enum, which represents the different error
//! types that can occur in the disto-rs crate.
//!
//! Malformed protocol tokens are deliberately absent: an undocumented protocol
//! produces plenty of noise, and the parser reports it as `None` instead.

use thiserror::Error;

/// Represents the different error types that can occur in the DISTO crate.
#[derive(Debug, Error)]
pub enum DistoError {
    /// Indicates an error opening or configuring the serial port.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates a read or write failure on an open transport.
    #[error("I/O error: {0}")]
    Io(String),

    /// Indicates a command text outside the ONLINE alphabet rules.
    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),

    /// Indicates an averaging capture was requested with an unusable sample count.
    #[error("Invalid averaging target: {0}")]
    InvalidAveragingTarget(usize),

    /// Indicates the session worker has stopped and no longer accepts requests.
    #[error("Session closed")]
    SessionClosed,

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string")]
    InvalidHexString,

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<std::io::Error> for DistoError {
    fn from(err: std::io::Error) -> Self {
        DistoError::Io(err.to_string())
    }
}

impl From<tokio_serial::Error> for DistoError {
    fn from(err: tokio_serial::Error) -> Self {
        DistoError::SerialPortError(err.to_string())
    }
}
