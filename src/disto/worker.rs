//! # Session Worker
//!
//! One task owns the transport, the line assembler, the protocol session and
//! the dispatcher queue. Nothing else touches them, so none of them needs a
//! lock; callers talk to the worker only through an inbound request channel
//! and an outbound event channel.
//!
//! Each iteration flushes queued writes, checks for idleness, then waits for
//! whichever comes first: the stop signal, a request, or incoming bytes. A
//! read never blocks for longer than `read_timeout`, so a silent device does
//! not starve the request queue.

use crate::disto::command::{AckStrategy, Command};
use crate::disto::dispatcher::CommandDispatcher;
use crate::disto::event::{ConnectionState, DistoEvent};
use crate::disto::framer::LineAssembler;
use crate::disto::serial::Transport;
use crate::disto::session::{Outgoing, ProtocolSession, SessionConfig, SessionOutput};
use crate::util::logging::{log_frame_hex, span_line_processing};
use log::{debug, info, warn};
use std::io;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{error::Elapsed, timeout};

/// Requests accepted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRequest {
    Send(Command),
    /// Bytes written verbatim, e.g. an experimental acknowledgment.
    SendRaw(Vec<u8>),
    StartAveraging(usize),
    StopAveraging,
    SetConfirmPush(bool),
    SetAckStrategy(AckStrategy),
}

enum Wake {
    Shutdown,
    Request(Option<SessionRequest>),
    Read(Result<io::Result<usize>, Elapsed>),
}

/// The single owner of a DISTO transport.
pub struct SessionWorker<T: Transport> {
    port: T,
    config: SessionConfig,
    session: ProtocolSession,
    assembler: LineAssembler,
    dispatcher: CommandDispatcher,
    requests: mpsc::UnboundedReceiver<SessionRequest>,
    events: mpsc::UnboundedSender<DistoEvent>,
    shutdown: oneshot::Receiver<()>,
}

impl<T: Transport> SessionWorker<T> {
    pub fn new(
        port: T,
        config: SessionConfig,
        requests: mpsc::UnboundedReceiver<SessionRequest>,
        events: mpsc::UnboundedSender<DistoEvent>,
        shutdown: oneshot::Receiver<()>,
    ) -> Self {
        SessionWorker {
            session: ProtocolSession::new(&config),
            assembler: LineAssembler::with_max_line_len(config.max_line_len),
            dispatcher: CommandDispatcher::new(config.line_ending, config.ack_strategy),
            port,
            config,
            requests,
            events,
            shutdown,
        }
    }

    /// Runs until stopped, until every request sender is gone, or until the transport fails.
    ///
    /// Always ends with a `Connection { Disconnected }` event.
    pub async fn run(mut self) {
        let mut out = SessionOutput::new();
        let mut buf = vec![0u8; self.config.read_chunk.max(1)];

        self.session.connection_opened(Instant::now(), &mut out);
        self.publish(&mut out);
        info!("Session started");

        let lost: Option<String> = loop {
            self.dispatcher
                .flush(&mut self.port, &mut self.session, &mut out)
                .await;
            self.session.check_idle(Instant::now(), &mut out);
            self.publish(&mut out);

            let wake = tokio::select! {
                biased;
                _ = &mut self.shutdown => Wake::Shutdown,
                request = self.requests.recv() => Wake::Request(request),
                read = timeout(self.config.read_timeout, self.port.read(&mut buf)) => Wake::Read(read),
            };

            match wake {
                Wake::Shutdown | Wake::Request(None) => break None,
                Wake::Request(Some(request)) => self.apply(request, &mut out),
                Wake::Read(Err(_)) => {}
                Wake::Read(Ok(Ok(0))) => break Some("end of stream".to_string()),
                Wake::Read(Ok(Ok(n))) => self.process_bytes(&buf[..n], &mut out),
                Wake::Read(Ok(Err(e)))
                    if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
                Wake::Read(Ok(Err(e))) => break Some(format!("Serial read error: {e}")),
            }
            self.publish(&mut out);
        };

        if let Some(reason) = lost {
            warn!("Connection lost: {reason}");
            out.events.push(DistoEvent::ConnectionLost { reason });
        }
        self.session.reset();
        self.assembler.reset();
        self.dispatcher.clear();
        out.outgoing.clear();
        out.events.push(DistoEvent::Connection {
            state: ConnectionState::Disconnected,
        });
        self.publish(&mut out);

        if let Err(e) = self.port.shutdown().await {
            debug!("Transport shutdown failed: {e}");
        }
        info!("Session stopped");
    }

    fn apply(&mut self, request: SessionRequest, out: &mut SessionOutput) {
        match request {
            SessionRequest::Send(command) => self.dispatcher.enqueue(Outgoing::Command(command)),
            SessionRequest::SendRaw(bytes) => self.dispatcher.enqueue(Outgoing::Raw(bytes)),
            SessionRequest::StartAveraging(target) => {
                if let Err(e) = self.session.start_averaging(target, out) {
                    out.events
                        .push(DistoEvent::debug(format!("Averaging not started: {e}")));
                }
            }
            SessionRequest::StopAveraging => self.session.stop_averaging(out),
            SessionRequest::SetConfirmPush(enabled) => self.session.set_confirm_push(enabled),
            SessionRequest::SetAckStrategy(strategy) => self.dispatcher.set_ack_strategy(strategy),
        }
    }

    fn process_bytes(&mut self, bytes: &[u8], out: &mut SessionOutput) {
        let now = Instant::now();
        log_frame_hex("RX", bytes);
        self.session.bytes_received(now, out);
        for line in self.assembler.feed(bytes) {
            let _span = span_line_processing(line.len());
            self.session.handle_line(&line, now, out);
        }
    }

    /// Routes session writes to the dispatcher and events to consumers, preserving order.
    fn publish(&mut self, out: &mut SessionOutput) {
        self.dispatcher.enqueue_all(out.outgoing.drain(..));
        for event in out.events.drain(..) {
            // a consumer that went away is not the worker's problem
            let _ = self.events.send(event);
        }
    }
}
