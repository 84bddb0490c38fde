//! # ONLINE Commands
//!
//! The command alphabet accepted by the DISTO in ONLINE mode, the line endings
//! used to frame commands on the wire, and the acknowledgment sequences sent in
//! push mode.
//!
//! Confirmed on a D8:
//!
//! | Command      | Meaning                    |
//! |--------------|----------------------------|
//! | `G` / `g`    | single measurement         |
//! | `H` / `h`    | start tracking             |
//! | `P` / `p`    | stop tracking, laser off   |
//! | `O` / `o`    | laser on                   |
//! | `C` / `c`    | clear                      |
//! | `T` / `t`    | temperature                |
//! | `K` / `k`    | signal strength            |
//! | `N00N`..`N03N` | device information       |
//! | `a`          | reset                      |
//! | `b`          | power off                  |

use crate::constants::{ACK_BYTE, CONFIRM_SEQUENCE};
use crate::error::DistoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Line ending appended to every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n`; firmware confirms commands reliably with it in continuous mode.
    #[default]
    CrLf,
    /// Bare `\r`.
    Cr,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Cr => b"\r",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineEnding::CrLf => "CRLF",
            LineEnding::Cr => "CR",
        }
    }
}

impl FromStr for LineEnding {
    type Err = DistoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crlf" => Ok(LineEnding::CrLf),
            "cr" => Ok(LineEnding::Cr),
            other => Err(DistoError::Other(format!("unknown line ending: {other}"))),
        }
    }
}

/// How a push-mode reading is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStrategy {
    /// The text sequence `cfm\n`.
    #[default]
    Cfm,
    /// A single ASCII ACK byte (0x06).
    Ack06,
    /// `cfm\n` followed by 0x06.
    Both,
}

impl AckStrategy {
    /// Bytes written for one acknowledgment.
    pub fn bytes(self) -> Vec<u8> {
        match self {
            AckStrategy::Cfm => CONFIRM_SEQUENCE.to_vec(),
            AckStrategy::Ack06 => vec![ACK_BYTE],
            AckStrategy::Both => {
                let mut bytes = CONFIRM_SEQUENCE.to_vec();
                bytes.push(ACK_BYTE);
                bytes
            }
        }
    }
}

impl FromStr for AckStrategy {
    type Err = DistoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cfm" => Ok(AckStrategy::Cfm),
            "ack06" | "ack" => Ok(AckStrategy::Ack06),
            "both" => Ok(AckStrategy::Both),
            other => Err(DistoError::Other(format!("unknown ack strategy: {other}"))),
        }
    }
}

/// Device information queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInfoQuery {
    SoftwareVersion,
    HardwareVersion,
    SerialNumber,
    ManufactureDate,
}

impl DeviceInfoQuery {
    pub const ALL: [DeviceInfoQuery; 4] = [
        DeviceInfoQuery::SoftwareVersion,
        DeviceInfoQuery::HardwareVersion,
        DeviceInfoQuery::SerialNumber,
        DeviceInfoQuery::ManufactureDate,
    ];

    fn code(self) -> &'static str {
        match self {
            DeviceInfoQuery::SoftwareVersion => "N00N",
            DeviceInfoQuery::HardwareVersion => "N01N",
            DeviceInfoQuery::SerialNumber => "N02N",
            DeviceInfoQuery::ManufactureDate => "N03N",
        }
    }
}

/// Effect a command has on the tracking flag once transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEffect {
    Start,
    Stop,
    None,
}

/// A validated ONLINE command: non-empty ASCII alphanumerics, sent without its line ending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Validates raw command text such as `"G"` or `"N00N"`.
    pub fn new(text: &str) -> Result<Self, DistoError> {
        if text.is_empty() || !text.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DistoError::InvalidCommand(text.to_string()));
        }
        Ok(Command(text.to_string()))
    }

    /// A single-letter command.
    pub fn letter(c: char) -> Result<Self, DistoError> {
        if !c.is_ascii_alphabetic() {
            return Err(DistoError::InvalidCommand(c.to_string()));
        }
        Ok(Command(c.to_string()))
    }

    pub fn measure() -> Self {
        Command("G".into())
    }

    pub fn start_tracking() -> Self {
        Command("H".into())
    }

    /// Stop tracking and switch the laser off.
    pub fn stop() -> Self {
        Command("P".into())
    }

    pub fn laser_on() -> Self {
        Command("O".into())
    }

    pub fn clear() -> Self {
        Command("c".into())
    }

    pub fn temperature() -> Self {
        Command("T".into())
    }

    pub fn signal() -> Self {
        Command("K".into())
    }

    pub fn reset() -> Self {
        Command("a".into())
    }

    pub fn power_off() -> Self {
        Command("b".into())
    }

    pub fn device_info(query: DeviceInfoQuery) -> Self {
        Command(query.code().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tracking_effect(&self) -> TrackingEffect {
        match self.0.as_str() {
            "H" | "h" => TrackingEffect::Start,
            "P" | "p" | "C" | "c" => TrackingEffect::Stop,
            _ => TrackingEffect::None,
        }
    }

    /// Wire bytes: command text followed by `ending`.
    pub fn encode(&self, ending: LineEnding) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 2);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.extend_from_slice(ending.as_bytes());
        bytes
    }
}

impl FromStr for Command {
    type Err = DistoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::new(s.trim())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
