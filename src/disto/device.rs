//! # DISTO Device Handle
//!
//! The caller-facing side of a session. A handle spawns one
//! [`SessionWorker`] on the tokio runtime and keeps the sending halves of
//! its channels; every operation here only enqueues a request and returns
//! immediately. Results arrive as [`DistoEvent`]s on the receiver returned
//! next to the handle.

use crate::disto::command::{AckStrategy, Command, DeviceInfoQuery};
use crate::disto::event::DistoEvent;
use crate::disto::serial::{open_serial, SerialConfig, Transport};
use crate::disto::session::SessionConfig;
use crate::disto::worker::{SessionRequest, SessionWorker};
use crate::error::DistoError;
use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle to a running DISTO session.
pub struct DistoDeviceHandle {
    requests: mpsc::UnboundedSender<SessionRequest>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DistoDeviceHandle {
    /// Opens `port_name` and starts a session on it.
    pub async fn connect(
        port_name: &str,
        serial: &SerialConfig,
        session: SessionConfig,
    ) -> Result<(DistoDeviceHandle, mpsc::UnboundedReceiver<DistoEvent>), DistoError> {
        let port = open_serial(port_name, serial)?;
        Ok(Self::spawn(port, session))
    }

    /// Starts a session on an already open transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(
        transport: T,
        config: SessionConfig,
    ) -> (DistoDeviceHandle, mpsc::UnboundedReceiver<DistoEvent>)
    where
        T: Transport + 'static,
    {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let worker = SessionWorker::new(transport, config, req_rx, evt_tx, stop_rx);
        let task = tokio::spawn(worker.run());

        let handle = DistoDeviceHandle {
            requests: req_tx,
            shutdown: Some(stop_tx),
            task: Some(task),
        };
        (handle, evt_rx)
    }

    fn request(&self, request: SessionRequest) -> Result<(), DistoError> {
        self.requests
            .send(request)
            .map_err(|_| DistoError::SessionClosed)
    }

    /// Queues `command` for transmission.
    pub fn send(&self, command: Command) -> Result<(), DistoError> {
        self.request(SessionRequest::Send(command))
    }

    /// Queues a single-letter command such as `G` or `H`.
    pub fn send_char(&self, c: char) -> Result<(), DistoError> {
        self.send(Command::letter(c)?)
    }

    /// Queues bytes that are written without any framing.
    pub fn send_raw(&self, bytes: Vec<u8>) -> Result<(), DistoError> {
        self.request(SessionRequest::SendRaw(bytes))
    }

    /// Starts averaging over `target` distance readings.
    pub fn start_averaging(&self, target: usize) -> Result<(), DistoError> {
        if target == 0 {
            return Err(DistoError::InvalidAveragingTarget(target));
        }
        self.request(SessionRequest::StartAveraging(target))
    }

    pub fn stop_averaging(&self) -> Result<(), DistoError> {
        self.request(SessionRequest::StopAveraging)
    }

    pub fn set_confirm_push(&self, enabled: bool) -> Result<(), DistoError> {
        self.request(SessionRequest::SetConfirmPush(enabled))
    }

    pub fn set_ack_strategy(&self, strategy: AckStrategy) -> Result<(), DistoError> {
        self.request(SessionRequest::SetAckStrategy(strategy))
    }

    /// Queues the four identification queries (`N00N` to `N03N`).
    pub fn request_device_info(&self) -> Result<(), DistoError> {
        for query in DeviceInfoQuery::ALL {
            self.send(Command::device_info(query))?;
        }
        Ok(())
    }

    /// True while the worker task has not finished.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stops the worker and waits for it to close the transport.
    ///
    /// Calling it again is a no-op.
    pub async fn disconnect(&mut self) -> Result<(), DistoError> {
        if let Some(stop) = self.shutdown.take() {
            // already gone if the worker ended on its own
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| DistoError::Other(format!("session task failed: {e}")))?;
            debug!("Session worker joined");
        }
        Ok(())
    }
}

impl Drop for DistoDeviceHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.shutdown.take() {
            let _ = stop.send(());
        }
    }
}
