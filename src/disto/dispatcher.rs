//! # Command Dispatcher
//!
//! FIFO of pending writes for one DISTO link. Only the session worker drains
//! it, between reads, so a command is never written while a response is being
//! parsed. Each item is written and flushed completely before the next one is
//! dequeued, and the session learns about a command only after its bytes left,
//! which keeps the confirmation grace window anchored to real transmission time.

use crate::disto::command::{AckStrategy, LineEnding};
use crate::disto::event::DistoEvent;
use crate::disto::session::{Outgoing, ProtocolSession, SessionOutput};
use crate::util::hex::escape_ascii;
use crate::util::logging::log_frame_hex;
use log::{debug, warn};
use std::collections::VecDeque;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Ordered queue of writes with the framing settings used to encode them.
#[derive(Debug)]
pub struct CommandDispatcher {
    queue: VecDeque<Outgoing>,
    line_ending: LineEnding,
    ack_strategy: AckStrategy,
}

impl CommandDispatcher {
    pub fn new(line_ending: LineEnding, ack_strategy: AckStrategy) -> Self {
        CommandDispatcher {
            queue: VecDeque::new(),
            line_ending,
            ack_strategy,
        }
    }

    pub fn enqueue(&mut self, item: Outgoing) {
        self.queue.push_back(item);
    }

    pub fn enqueue_all(&mut self, items: impl IntoIterator<Item = Outgoing>) {
        self.queue.extend(items);
    }

    /// Number of writes waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    pub fn ack_strategy(&self) -> AckStrategy {
        self.ack_strategy
    }

    pub fn set_ack_strategy(&mut self, ack_strategy: AckStrategy) {
        self.ack_strategy = ack_strategy;
    }

    /// Drops everything still queued.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Wire bytes for one queued item.
    pub fn encode(&self, item: &Outgoing) -> Vec<u8> {
        match item {
            Outgoing::Command(command) => command.encode(self.line_ending),
            Outgoing::Confirm => self.ack_strategy.bytes(),
            Outgoing::Raw(bytes) => bytes.clone(),
        }
    }

    /// Writes every queued item in FIFO order.
    ///
    /// A failed write drops that item, reports it as a debug event and moves
    /// on; one bad write must not end the session. Returns the number of
    /// items written successfully.
    pub async fn flush<T>(
        &mut self,
        port: &mut T,
        session: &mut ProtocolSession,
        out: &mut SessionOutput,
    ) -> usize
    where
        T: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0;
        while let Some(item) = self.queue.pop_front() {
            let bytes = self.encode(&item);
            match write_flushed(port, &bytes).await {
                Ok(()) => {
                    written += 1;
                    log_frame_hex("TX", &bytes);
                    self.report_transmitted(&item, &bytes, session, out);
                }
                Err(e) => {
                    warn!("Write of {:?} failed: {e}", escape_ascii(&bytes));
                    out.events
                        .push(DistoEvent::debug(format!("Write error: {e}")));
                }
            }
        }
        written
    }

    fn report_transmitted(
        &self,
        item: &Outgoing,
        bytes: &[u8],
        session: &mut ProtocolSession,
        out: &mut SessionOutput,
    ) {
        let note = match item {
            Outgoing::Command(command) => {
                session.command_transmitted(command, Instant::now(), out);
                format!("TX CMD: {:?} ({})", command.as_str(), self.line_ending.name())
            }
            Outgoing::Confirm | Outgoing::Raw(_) => format!("TX: {}", escape_ascii(bytes)),
        };
        debug!("{note}");
        out.events.push(DistoEvent::debug(note));
    }
}

async fn write_flushed<T>(port: &mut T, bytes: &[u8]) -> std::io::Result<()>
where
    T: AsyncWrite + Unpin + ?Sized,
{
    port.write_all(bytes).await?;
    port.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disto::command::Command;
    use crate::disto::serial_mock::MockSerialPort;
    use crate::disto::session::SessionConfig;
    use std::io;

    fn setup() -> (CommandDispatcher, ProtocolSession, MockSerialPort) {
        let config = SessionConfig::default();
        (
            CommandDispatcher::new(config.line_ending, config.ack_strategy),
            ProtocolSession::new(&config),
            MockSerialPort::new(),
        )
    }

    #[tokio::test]
    async fn test_flush_writes_in_fifo_order() {
        let (mut dispatcher, mut session, mut port) = setup();
        dispatcher.enqueue(Outgoing::Command(Command::measure()));
        dispatcher.enqueue(Outgoing::Confirm);
        dispatcher.enqueue(Outgoing::Command(Command::stop()));
        let mut out = SessionOutput::new();

        let written = dispatcher.flush(&mut port, &mut session, &mut out).await;

        assert_eq!(written, 3);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(port.get_tx_data(), b"G\r\ncfm\nP\r\n");
    }

    #[tokio::test]
    async fn test_transmission_updates_session() {
        let (mut dispatcher, mut session, mut port) = setup();
        dispatcher.enqueue(Outgoing::Command(Command::start_tracking()));
        let mut out = SessionOutput::new();
        let before = Instant::now();

        dispatcher.flush(&mut port, &mut session, &mut out).await;

        assert!(session.state().tracking_active);
        assert!(session.state().last_command_time.unwrap() >= before);
        assert!(out
            .events
            .contains(&DistoEvent::Tracking { active: true }));
    }

    #[tokio::test]
    async fn test_confirm_does_not_count_as_command() {
        let (mut dispatcher, mut session, mut port) = setup();
        dispatcher.set_ack_strategy(AckStrategy::Both);
        dispatcher.enqueue(Outgoing::Confirm);
        let mut out = SessionOutput::new();

        dispatcher.flush(&mut port, &mut session, &mut out).await;

        assert_eq!(port.get_tx_data(), b"cfm\n\x06");
        assert!(session.state().last_command_time.is_none());
    }

    #[tokio::test]
    async fn test_failed_write_is_dropped_and_flush_continues() {
        let (mut dispatcher, mut session, mut port) = setup();
        dispatcher.set_line_ending(LineEnding::Cr);
        port.set_write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        dispatcher.enqueue(Outgoing::Command(Command::start_tracking()));
        dispatcher.enqueue(Outgoing::Command(Command::measure()));
        let mut out = SessionOutput::new();

        let written = dispatcher.flush(&mut port, &mut session, &mut out).await;

        assert_eq!(written, 1);
        assert_eq!(port.get_tx_data(), b"G\r");
        assert!(!session.state().tracking_active);
        assert!(matches!(&out.events[0], DistoEvent::Debug { text } if text.starts_with("Write error")));
    }
}
