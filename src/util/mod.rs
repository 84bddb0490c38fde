//! # Utility Modules
//!
//! Common helpers used throughout the disto-rs crate: hex formatting of raw
//! link traffic and logging utilities.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, escape_ascii, format_hex_compact};
pub use logging::{log_frame_hex, LogThrottle};
