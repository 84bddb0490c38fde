//! # Hex and Escape Helpers
//!
//! Formatting helpers for raw RX/TX bytes: hex via the `hex` crate, plus a
//! printable rendering of mostly-ASCII device output with control bytes
//! escaped (`31..00+0012345\r\n`).
//!
//! ```rust
//! use disto_rs::util::hex::{encode_hex, decode_hex, escape_ascii};
//!
//! assert_eq!(encode_hex(b"G\r\n"), "470d0a");
//! assert_eq!(decode_hex("06 0a").unwrap(), vec![0x06, 0x0a]);
//! assert_eq!(escape_ascii(b"cfm\n"), "cfm\\n");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

impl From<HexError> for crate::error::DistoError {
    fn from(_: HexError) -> Self {
        crate::error::DistoError::InvalidHexString
    }
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Space-separated hex, e.g. `47 0d 0a`
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable text with `\r`, `\n`, `\t` escaped and other non-printables as `\xNN`
pub fn escape_ascii(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        match b {
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("   "), Err(HexError::EmptyString));
        assert_eq!(decode_hex("060"), Err(HexError::OddLength(3)));
        assert!(matches!(decode_hex("zz"), Err(HexError::DecodeError(_))));
    }

    #[test]
    fn test_format_hex_compact() {
        assert_eq!(format_hex_compact(b"P\r\n"), "50 0d 0a");
        assert_eq!(format_hex_compact(&[]), "");
    }

    #[test]
    fn test_escape_ascii() {
        assert_eq!(escape_ascii(b"31..00+0012345\r\n"), "31..00+0012345\\r\\n");
        assert_eq!(escape_ascii(&[0x06, b'a']), "\\x06a");
    }
}
