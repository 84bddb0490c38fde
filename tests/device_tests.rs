//! End-to-end tests of a running session against the mock serial port.

use disto_rs::disto::serial_mock::MockSerialPort;
use disto_rs::{
    AckStrategy, Command, ConnectionState, DistoDeviceHandle, DistoError, DistoEvent,
    LineEnding, SessionConfig, StatusKind,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

async fn next_event(events: &mut UnboundedReceiver<DistoEvent>) -> DistoEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Waits for the first event matching `pred`, skipping the rest.
async fn wait_for<F>(events: &mut UnboundedReceiver<DistoEvent>, pred: F) -> DistoEvent
where
    F: Fn(&DistoEvent) -> bool,
{
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}

async fn wait_for_tx(port: &MockSerialPort, expected: &[u8]) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while port.get_tx_data() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("tx was {:?}", String::from_utf8_lossy(&port.get_tx_data())));
}

fn spawn(config: SessionConfig) -> (MockSerialPort, DistoDeviceHandle, UnboundedReceiver<DistoEvent>) {
    let port = MockSerialPort::new();
    let (handle, events) = DistoDeviceHandle::spawn(port.clone(), config);
    (port, handle, events)
}

/// The first event announces the connection.
#[tokio::test]
async fn test_connected_event_first() {
    let (_port, mut handle, mut events) = spawn(SessionConfig::default());
    assert_eq!(
        next_event(&mut events).await,
        DistoEvent::Connection {
            state: ConnectionState::Connected
        }
    );
    handle.disconnect().await.unwrap();
}

/// Commands are framed with the configured ending and written in order.
#[tokio::test]
async fn test_commands_written_fifo() {
    let config = SessionConfig {
        line_ending: LineEnding::Cr,
        ..SessionConfig::default()
    };
    let (port, mut handle, _events) = spawn(config);
    handle.send(Command::start_tracking()).unwrap();
    handle.send_char('G').unwrap();
    handle.send(Command::stop()).unwrap();
    wait_for_tx(&port, b"H\rG\rP\r").await;
    handle.disconnect().await.unwrap();
}

/// A pushed distance produces a word event and a `cfm` confirmation.
#[tokio::test]
async fn test_push_reading_is_confirmed() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    port.queue_line("31..00+0002500");
    let word = wait_for(&mut events, |e| matches!(e, DistoEvent::Word { .. })).await;
    if let DistoEvent::Word { word, .. } = word {
        assert!((word.value - 2.5).abs() < 1e-12);
    }
    wait_for_tx(&port, b"cfm\n").await;
    handle.disconnect().await.unwrap();
}

/// The `Both` strategy sends the text confirmation followed by ACK.
#[tokio::test]
async fn test_ack_strategy_both() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    handle.set_ack_strategy(AckStrategy::Both).unwrap();
    // the strategy change is applied before the reading arrives
    next_event(&mut events).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    port.queue_line("31..00+0002500");
    wait_for_tx(&port, b"cfm\n\x06").await;
    handle.disconnect().await.unwrap();
}

/// No confirmation is sent while confirmation is disabled.
#[tokio::test]
async fn test_confirm_disabled() {
    let config = SessionConfig {
        confirm_push: false,
        ..SessionConfig::default()
    };
    let (port, mut handle, mut events) = spawn(config);
    port.queue_line("31..00+0002500");
    wait_for(&mut events, |e| matches!(e, DistoEvent::Word { .. })).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(port.get_tx_data().is_empty());
    handle.disconnect().await.unwrap();
}

/// Status and unparsed lines are reported in stream order.
#[tokio::test]
async fn test_event_order_follows_stream() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    port.queue_rx_data(b"@E203\r\nfoo\r?\n");
    let first = wait_for(&mut events, |e| !matches!(e, DistoEvent::Connection { .. })).await;
    assert_eq!(
        first,
        DistoEvent::Status {
            text: "@E203".into(),
            kind: StatusKind::Error
        }
    );
    assert_eq!(next_event(&mut events).await, DistoEvent::Unparsed { text: "foo".into() });
    assert_eq!(
        next_event(&mut events).await,
        DistoEvent::Status {
            text: "?".into(),
            kind: StatusKind::Ok
        }
    );
    handle.disconnect().await.unwrap();
}

/// A full averaging capture through the handle ends with `AvgDone` and a stop command.
#[tokio::test]
async fn test_averaging_through_handle() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    handle.start_averaging(2).unwrap();
    wait_for(&mut events, |e| *e == DistoEvent::Tracking { active: true }).await;
    port.queue_line("31..00+0001000");
    port.queue_line("31..00+0003000");
    let done = wait_for(&mut events, |e| matches!(e, DistoEvent::AvgDone { .. })).await;
    assert_eq!(done, DistoEvent::AvgDone { mean: 2.0, count: 2 });
    wait_for(&mut events, |e| *e == DistoEvent::Tracking { active: false }).await;
    assert_eq!(port.get_tx_data(), b"H\r\nP\r\n");
    handle.disconnect().await.unwrap();
}

/// A read failure ends the session with `ConnectionLost` then `Disconnected`.
#[tokio::test]
async fn test_read_error_ends_session() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    next_event(&mut events).await;
    port.set_read_error(io::Error::new(io::ErrorKind::Other, "device unplugged"));
    match next_event(&mut events).await {
        DistoEvent::ConnectionLost { reason } => assert!(reason.contains("device unplugged")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(next_event(&mut events).await.is_terminal());
    assert!(events.recv().await.is_none());
    assert!(matches!(
        handle.send(Command::measure()),
        Err(DistoError::SessionClosed)
    ));
    handle.disconnect().await.unwrap();
}

/// A failed write is reported and the next command still goes out.
#[tokio::test]
async fn test_write_error_is_not_fatal() {
    let (port, mut handle, mut events) = spawn(SessionConfig::default());
    port.set_write_error(io::Error::new(io::ErrorKind::BrokenPipe, "busy"));
    handle.send(Command::measure()).unwrap();
    wait_for(&mut events, |e| {
        matches!(e, DistoEvent::Debug { text } if text.starts_with("Write error"))
    })
    .await;
    handle.send(Command::temperature()).unwrap();
    wait_for_tx(&port, b"T\r\n").await;
    handle.disconnect().await.unwrap();
}

/// Device info queries go out as four commands.
#[tokio::test]
async fn test_device_info_queries() {
    let (port, mut handle, _events) = spawn(SessionConfig::default());
    handle.request_device_info().unwrap();
    wait_for_tx(&port, b"N00N\r\nN01N\r\nN02N\r\nN03N\r\n").await;
    handle.disconnect().await.unwrap();
}

/// Disconnect emits the terminal event and closes the event stream.
#[tokio::test]
async fn test_disconnect_closes_events() {
    let (_port, mut handle, mut events) = spawn(SessionConfig::default());
    handle.disconnect().await.unwrap();
    let mut last = None;
    while let Some(event) = events.recv().await {
        last = Some(event);
    }
    assert!(last.unwrap().is_terminal());
    assert!(!handle.is_running());
}
