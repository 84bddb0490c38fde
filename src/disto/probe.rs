//! # One-shot Probe
//!
//! Sends a single command outside of a session and reports what came back
//! within a read window. Some commands switch an undocumented firmware into
//! continuous output; [`looks_streaming`] recognizes that from one window of
//! received bytes, and the probe then sends `P` to stop the device before
//! the stream floods the link.

use crate::constants::{
    STREAMING_BYTE_THRESHOLD, STREAMING_TERMINATOR_THRESHOLD, STREAMING_TOKEN_THRESHOLD,
    STREAM_STOP_WINDOW,
};
use crate::disto::command::{Command, LineEnding};
use crate::disto::framer::count_terminators;
use crate::disto::serial::Transport;
use crate::disto::token::{classify_line, count_distance_tokens, parse_token, Line, StatusKind};
use crate::error::DistoError;
use crate::util::logging::log_frame_hex;
use log::{debug, warn};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

/// True when one read window suggests the device started streaming.
pub fn looks_streaming(rx: &[u8]) -> bool {
    if rx.len() >= STREAMING_BYTE_THRESHOLD {
        return true;
    }
    let text = String::from_utf8_lossy(rx);
    count_distance_tokens(&text) >= STREAMING_TOKEN_THRESHOLD
        || count_terminators(rx) >= STREAMING_TERMINATOR_THRESHOLD
}

/// Coarse classification of a probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeClass {
    Distance,
    Ok,
    Error,
    Status,
    None,
}

/// Classifies a whole response window.
///
/// Returns the class, the last measurement in meters (magnitudes read as
/// millimeters) and the whitespace-separated tokens.
pub fn classify_response(text: &str) -> (ProbeClass, Option<f64>, Vec<String>) {
    match classify_line(text) {
        Line::Empty => (ProbeClass::None, None, Vec::new()),
        Line::Status {
            kind: StatusKind::Ok,
            ..
        } => (ProbeClass::Ok, None, Vec::new()),
        Line::Status {
            text,
            kind: StatusKind::Error,
        } => (ProbeClass::Error, None, vec![text.to_string()]),
        Line::Status { text, .. } => (
            ProbeClass::Status,
            None,
            text.split_whitespace().map(str::to_string).collect(),
        ),
        Line::Tokens(tokens) => {
            let meters = tokens
                .iter()
                .filter_map(|t| parse_token(t))
                .last()
                .map(|w| w.signed_raw() as f64 / 1000.0);
            let class = if meters.is_some() {
                ProbeClass::Distance
            } else {
                ProbeClass::Status
            };
            (class, meters, tokens.into_iter().map(str::to_string).collect())
        }
    }
}

/// Outcome of [`send_and_collect`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub tx: Vec<u8>,
    pub rx: Vec<u8>,
    pub class: ProbeClass,
    pub meters: Option<f64>,
    pub tokens: Vec<String>,
    /// Response to the stop sent after streaming was detected.
    pub stream_stop_rx: Option<Vec<u8>>,
}

impl ProbeReport {
    pub fn streaming(&self) -> bool {
        self.stream_stop_rx.is_some()
    }
}

/// Reads whatever arrives during `window`.
///
/// An end of stream ends the window early; read errors are returned.
pub async fn collect_for<T>(port: &mut T, window: Duration) -> Result<Vec<u8>, DistoError>
where
    T: Transport + ?Sized,
{
    let deadline = Instant::now() + window;
    let mut rx = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match timeout_at(deadline, port.read(&mut buf)).await {
            Err(_) => break,
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => rx.extend_from_slice(&buf[..n]),
            Ok(Err(e)) => return Err(e.into()),
        }
    }
    Ok(rx)
}

/// Sends `command` once and collects the response for `window`.
///
/// When the response looks like streaming, `P` + CRLF is sent and its
/// response collected as well.
pub async fn send_and_collect<T>(
    port: &mut T,
    command: &Command,
    ending: LineEnding,
    window: Duration,
) -> Result<ProbeReport, DistoError>
where
    T: Transport + ?Sized,
{
    if let Err(e) = port.discard_input().await {
        debug!("Could not discard pending input: {e}");
    }

    let tx = command.encode(ending);
    port.write_all(&tx).await?;
    port.flush().await?;
    log_frame_hex("TX", &tx);

    let rx = collect_for(port, window).await?;
    log_frame_hex("RX", &rx);

    let text = String::from_utf8_lossy(&rx);
    let (class, meters, tokens) = classify_response(&text);

    let stream_stop_rx = if looks_streaming(&rx) {
        warn!("{command} looks like it started streaming; sending stop");
        let stop = Command::stop().encode(LineEnding::CrLf);
        port.write_all(&stop).await?;
        port.flush().await?;
        Some(collect_for(port, STREAM_STOP_WINDOW).await?)
    } else {
        None
    };

    Ok(ProbeReport {
        tx,
        rx,
        class,
        meters,
        tokens,
        stream_stop_rx,
    })
}
