//! # Protocol Session
//!
//! The per-connection state machine of a DISTO link. It never touches the
//! transport: the worker hands it received lines and transmission notices
//! together with the current [`Instant`], and it answers with events for
//! consumers plus [`Outgoing`] items for the dispatcher. That keeps every
//! timing rule testable with synthetic clocks.
//!
//! Tracking and averaging are two independent flags. Averaging overlays
//! tracking: starting a capture switches tracking on when needed, and reaching
//! the target switches it off again.
//!
//! Push-mode confirmation: some firmware withholds the next autonomous reading
//! until it is acknowledged. A distance word is confirmed when confirmation is
//! enabled, tracking is off, and our own last command is older than the grace
//! window (so replies to our commands are not confirmed).

use crate::constants::{
    CONFIRM_GRACE_WINDOW, DEFAULT_IDLE_TIMEOUT, DEFAULT_READ_CHUNK, DEFAULT_READ_TIMEOUT,
    MAX_LINE_LEN,
};
use crate::disto::command::{AckStrategy, Command, LineEnding, TrackingEffect};
use crate::disto::event::{ConnectionState, DistoEvent};
use crate::disto::token::{classify_line, parse_token, Line, MeasurementWord, StatusKind, WordKind};
use crate::error::DistoError;
use crate::util::logging::LogThrottle;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Session and worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub line_ending: LineEnding,
    pub ack_strategy: AckStrategy,
    /// Confirm push-mode readings.
    pub confirm_push: bool,
    pub confirm_grace: Duration,
    /// Upper bound a single read blocks before the worker polls its queues again.
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
    pub read_chunk: usize,
    pub max_line_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            line_ending: LineEnding::CrLf,
            ack_strategy: AckStrategy::Cfm,
            confirm_push: true,
            confirm_grace: CONFIRM_GRACE_WINDOW,
            read_timeout: DEFAULT_READ_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            read_chunk: DEFAULT_READ_CHUNK,
            max_line_len: MAX_LINE_LEN,
        }
    }
}

/// Client-side averaging capture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Averaging {
    #[default]
    Inactive,
    Active { target: usize, samples: Vec<f64> },
}

impl Averaging {
    pub fn is_active(&self) -> bool {
        matches!(self, Averaging::Active { .. })
    }
}

/// Mutable per-connection state, owned by one [`ProtocolSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub tracking_active: bool,
    /// When our last command finished transmitting; `None` before the first one.
    pub last_command_time: Option<Instant>,
    pub last_receive_time: Option<Instant>,
    pub averaging: Averaging,
    pub confirm_push_enabled: bool,
}

impl SessionState {
    fn new(confirm_push_enabled: bool) -> Self {
        SessionState {
            tracking_active: false,
            last_command_time: None,
            last_receive_time: None,
            averaging: Averaging::Inactive,
            confirm_push_enabled,
        }
    }
}

/// Something the session wants written to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// A framed command; its transmission is reported back through
    /// [`ProtocolSession::command_transmitted`].
    Command(Command),
    /// One push-mode acknowledgment, encoded by the dispatcher's strategy.
    Confirm,
    /// Bytes written verbatim.
    Raw(Vec<u8>),
}

/// Events and writes produced by one session step.
#[derive(Debug, Default)]
pub struct SessionOutput {
    pub events: Vec<DistoEvent>,
    pub outgoing: Vec<Outgoing>,
}

impl SessionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, event: DistoEvent) {
        self.events.push(event);
    }

    fn send(&mut self, outgoing: Outgoing) {
        self.outgoing.push(outgoing);
    }
}

/// The DISTO protocol state machine.
#[derive(Debug)]
pub struct ProtocolSession {
    state: SessionState,
    confirm_grace: Duration,
    idle_timeout: Duration,
    connection: ConnectionState,
    error_throttle: LogThrottle,
    unparsed_throttle: LogThrottle,
}

impl ProtocolSession {
    pub fn new(config: &SessionConfig) -> Self {
        ProtocolSession {
            state: SessionState::new(config.confirm_push),
            confirm_grace: config.confirm_grace,
            idle_timeout: config.idle_timeout,
            connection: ConnectionState::Disconnected,
            error_throttle: LogThrottle::new(1000, 5),
            unparsed_throttle: LogThrottle::new(1000, 5),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Marks the transport as open.
    pub fn connection_opened(&mut self, now: Instant, out: &mut SessionOutput) {
        self.state.last_receive_time = Some(now);
        self.set_connection(ConnectionState::Connected, out);
    }

    /// Records that bytes arrived; leaves the idle state if needed.
    pub fn bytes_received(&mut self, now: Instant, out: &mut SessionOutput) {
        self.state.last_receive_time = Some(now);
        if self.connection == ConnectionState::Idle {
            self.set_connection(ConnectionState::Connected, out);
        }
    }

    /// Reports the link idle once nothing was received for the idle timeout.
    pub fn check_idle(&mut self, now: Instant, out: &mut SessionOutput) {
        if self.connection != ConnectionState::Connected {
            return;
        }
        let silent = self
            .state
            .last_receive_time
            .map_or(false, |t| now.saturating_duration_since(t) > self.idle_timeout);
        if silent {
            self.set_connection(ConnectionState::Idle, out);
        }
    }

    /// Processes one line produced by the assembler.
    pub fn handle_line(&mut self, raw: &str, now: Instant, out: &mut SessionOutput) {
        match classify_line(raw) {
            Line::Empty => {}
            Line::Status { text, kind } => {
                if kind == StatusKind::Error && self.error_throttle.allow() {
                    warn!("Device reported {text}");
                }
                out.emit(DistoEvent::Status {
                    text: text.to_string(),
                    kind,
                });
            }
            Line::Tokens(tokens) => {
                for token in tokens {
                    match parse_token(token) {
                        Some(word) => self.handle_word(word, now, out),
                        None => {
                            if self.unparsed_throttle.allow() {
                                debug!("Unparsed token {token:?}");
                            }
                            out.emit(DistoEvent::Unparsed {
                                text: token.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn handle_word(&mut self, word: MeasurementWord, now: Instant, out: &mut SessionOutput) {
        let kind = word.kind;
        let value = word.value;
        out.emit(DistoEvent::Word {
            timestamp: chrono::Local::now(),
            word,
        });

        if kind != WordKind::Distance {
            return;
        }

        if let Averaging::Active { target, samples } = &mut self.state.averaging {
            samples.push(value);
            let count = samples.len();
            let target = *target;
            if count >= target {
                let mean = samples.iter().sum::<f64>() / count as f64;
                info!("Averaging done: {count} samples, mean {mean:.4} m");
                self.state.averaging = Averaging::Inactive;
                out.emit(DistoEvent::AvgDone { mean, count });
                out.send(Outgoing::Command(Command::stop()));
            } else {
                out.emit(DistoEvent::AvgProgress { count, target });
            }
        }

        if self.should_confirm(now) {
            debug!("Confirming push-mode reading");
            out.send(Outgoing::Confirm);
        }
    }

    fn should_confirm(&self, now: Instant) -> bool {
        let outside_grace = self
            .state
            .last_command_time
            .map_or(true, |t| now.saturating_duration_since(t) > self.confirm_grace);
        self.state.confirm_push_enabled && outside_grace && !self.state.tracking_active
    }

    /// Called by the dispatcher once `command` is fully written and flushed.
    pub fn command_transmitted(&mut self, command: &Command, now: Instant, out: &mut SessionOutput) {
        self.state.last_command_time = Some(now);
        match command.tracking_effect() {
            TrackingEffect::Start => {
                self.state.tracking_active = true;
                out.emit(DistoEvent::Tracking { active: true });
            }
            TrackingEffect::Stop => {
                self.state.tracking_active = false;
                out.emit(DistoEvent::Tracking { active: false });
            }
            TrackingEffect::None => {}
        }
    }

    /// Starts an averaging capture of `target` distance samples.
    pub fn start_averaging(&mut self, target: usize, out: &mut SessionOutput) -> Result<(), DistoError> {
        if target == 0 {
            return Err(DistoError::InvalidAveragingTarget(target));
        }
        self.state.averaging = Averaging::Active {
            target,
            samples: Vec::with_capacity(target),
        };
        out.emit(DistoEvent::AvgProgress { count: 0, target });
        if !self.state.tracking_active {
            out.send(Outgoing::Command(Command::start_tracking()));
        }
        Ok(())
    }

    /// Cancels a running capture. Tracking is left as it is.
    pub fn stop_averaging(&mut self, out: &mut SessionOutput) {
        if let Averaging::Active { target, samples } = std::mem::take(&mut self.state.averaging) {
            out.emit(DistoEvent::AvgCancelled {
                count: samples.len(),
                target,
            });
        }
    }

    pub fn set_confirm_push(&mut self, enabled: bool) {
        self.state.confirm_push_enabled = enabled;
    }

    /// Returns to the closed state, keeping only the confirmation preference.
    pub fn reset(&mut self) {
        self.state = SessionState::new(self.state.confirm_push_enabled);
        self.connection = ConnectionState::Disconnected;
    }

    fn set_connection(&mut self, state: ConnectionState, out: &mut SessionOutput) {
        if self.connection != state {
            debug!("Connection {:?} -> {:?}", self.connection, state);
            self.connection = state;
            out.emit(DistoEvent::Connection { state });
        }
    }
}
