//! Events emitted by a DISTO session to its consumers (UI, CSV logger, console).

use crate::disto::token::{MeasurementWord, StatusKind};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Connection lifecycle as seen by the session worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    /// Open, but nothing received for the idle timeout.
    Idle,
    Disconnected,
}

/// Everything a session reports, in the order it was derived from the byte stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistoEvent {
    /// A decoded measurement word.
    Word {
        timestamp: DateTime<Local>,
        #[serde(flatten)]
        word: MeasurementWord,
    },
    /// `?` or an `@...` report.
    Status { text: String, kind: StatusKind },
    /// Tracking flag after a start/stop/clear command went out.
    Tracking { active: bool },
    AvgProgress { count: usize, target: usize },
    AvgDone { mean: f64, count: usize },
    /// An averaging capture was stopped before reaching its target.
    AvgCancelled { count: usize, target: usize },
    /// A token that is not a measurement word.
    Unparsed { text: String },
    /// Transmission notes and recoverable faults.
    Debug { text: String },
    Connection { state: ConnectionState },
    /// The transport failed or closed; a `Connection { Disconnected }` follows.
    ConnectionLost { reason: String },
}

impl DistoEvent {
    pub(crate) fn debug(text: impl Into<String>) -> Self {
        DistoEvent::Debug { text: text.into() }
    }

    /// True for the final event a worker emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DistoEvent::Connection {
                state: ConnectionState::Disconnected
            }
        )
    }
}

impl fmt::Display for DistoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistoEvent::Word { timestamp, word } => write!(
                f,
                "{}  {}  [{}]",
                timestamp.format("%Y-%m-%dT%H:%M:%S"),
                word,
                word.token
            ),
            DistoEvent::Status { text, .. } => write!(f, "STATUS: {text}"),
            DistoEvent::Tracking { active } => {
                write!(f, "Tracking: {}", if *active { "ON" } else { "OFF" })
            }
            DistoEvent::AvgProgress { count, target } => write!(f, "Sampling {count}/{target}"),
            DistoEvent::AvgDone { mean, count } => {
                write!(f, "AVG DONE: {count} samples -> {mean:.3} m")
            }
            DistoEvent::AvgCancelled { count, target } => {
                write!(f, "AVG cancelled at {count}/{target}")
            }
            DistoEvent::Unparsed { text } => write!(f, "UNPARSED: {text}"),
            DistoEvent::Debug { text } => f.write_str(text),
            DistoEvent::Connection { state } => write!(f, "Connection: {state:?}"),
            DistoEvent::ConnectionLost { reason } => write!(f, "Connection lost: {reason}"),
        }
    }
}
