//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test
//! the DISTO session worker without requiring actual hardware.
//! Reads stay pending until data is queued (like a silent device), and
//! read and write failures can be injected separately.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Error returned by the next read
    pub next_read_error: Arc<Mutex<Option<io::Error>>>,
    /// Error returned by the next write
    pub next_write_error: Arc<Mutex<Option<io::Error>>>,
    /// Once set, an empty receive buffer reads as end-of-stream
    pub closed: Arc<Mutex<bool>>,
    reader: Arc<Mutex<Option<Waker>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.rx_buffer.lock().unwrap().extend(data);
        self.wake_reader();
    }

    /// Queue one line of device output terminated with CRLF
    pub fn queue_line(&self, line: &str) {
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.queue_rx_data(&data);
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Fail the next read with `error`
    pub fn set_read_error(&self, error: io::Error) {
        *self.next_read_error.lock().unwrap() = Some(error);
        self.wake_reader();
    }

    /// Fail the next write with `error`
    pub fn set_write_error(&self, error: io::Error) {
        *self.next_write_error.lock().unwrap() = Some(error);
    }

    /// Simulate the device going away: pending data is still delivered, then EOF
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.wake_reader();
    }

    fn wake_reader(&self) {
        if let Some(waker) = self.reader.lock().unwrap().take() {
            waker.wake();
        }
    }
}

// Implement AsyncRead for MockSerialPort
impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_read_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        let available = rx.len().min(buf.remaining());

        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
            return Poll::Ready(Ok(()));
        }

        if *self.closed.lock().unwrap() {
            return Poll::Ready(Ok(()));
        }

        *self.reader.lock().unwrap() = Some(cx.waker().clone());
        Poll::Pending
    }
}

// Implement AsyncWrite for MockSerialPort
impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_write_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        self.tx_buffer.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
