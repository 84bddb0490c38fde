//! Tests for the one-shot probe and the streaming heuristic.

use disto_rs::disto::probe::{
    classify_response, collect_for, looks_streaming, send_and_collect, ProbeClass,
};
use disto_rs::disto::serial_mock::MockSerialPort;
use disto_rs::{Command, LineEnding};
use std::time::Duration;

/// Answers the first write on `port` with `reply`, and a later stop with `stop_reply`.
fn respond(port: &MockSerialPort, reply: &'static [u8], stop_reply: &'static [u8]) {
    let device = port.clone();
    tokio::spawn(async move {
        while device.get_tx_data().is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        device.queue_rx_data(reply);
        while !device.get_tx_data().ends_with(b"P\r\n") {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        device.queue_rx_data(stop_reply);
    });
}

/// A single distance reply is classified and not treated as streaming.
#[tokio::test]
async fn test_single_reply() {
    let mut port = MockSerialPort::new();
    respond(&port, b"31..00+0004321\r\n", b"");
    let report = send_and_collect(
        &mut port,
        &Command::measure(),
        LineEnding::Cr,
        Duration::from_millis(150),
    )
    .await
    .unwrap();

    assert_eq!(report.tx, b"G\r");
    assert_eq!(report.class, ProbeClass::Distance);
    assert_eq!(report.meters, Some(4.321));
    assert!(!report.streaming());
    assert_eq!(port.get_tx_data(), b"G\r");
}

/// A burst of readings triggers a stop command and collects its reply.
#[tokio::test]
async fn test_streaming_reply_is_stopped() {
    let mut port = MockSerialPort::new();
    respond(&port, b"31..00+0001000\r\n31..00+0001001\r\n", b"?\r\n");
    let report = send_and_collect(
        &mut port,
        &Command::start_tracking(),
        LineEnding::CrLf,
        Duration::from_millis(150),
    )
    .await
    .unwrap();

    assert!(report.streaming());
    assert_eq!(report.stream_stop_rx.as_deref(), Some(&b"?\r\n"[..]));
    assert_eq!(port.get_tx_data(), b"H\r\nP\r\n");
}

/// Silence yields an empty report.
#[tokio::test]
async fn test_no_reply() {
    let mut port = MockSerialPort::new();
    let report = send_and_collect(
        &mut port,
        &Command::letter('Z').unwrap(),
        LineEnding::CrLf,
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    assert!(report.rx.is_empty());
    assert_eq!(report.class, ProbeClass::None);
}

/// Stale input is discarded before the command is written.
#[tokio::test]
async fn test_stale_input_discarded() {
    let mut port = MockSerialPort::new();
    port.queue_rx_data(b"31..00+0009999\r\n");
    let report = send_and_collect(
        &mut port,
        &Command::measure(),
        LineEnding::CrLf,
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    assert!(report.rx.is_empty());
}

/// Collection stops at end of stream.
#[tokio::test]
async fn test_collect_stops_at_eof() {
    let mut port = MockSerialPort::new();
    port.queue_rx_data(b"?\r\n");
    port.close();
    let rx = collect_for(&mut port, Duration::from_secs(5)).await.unwrap();
    assert_eq!(rx, b"?\r\n");
}

/// Two word-shaped tokens of any kind in one window look like streaming.
#[test]
fn test_temperature_and_signal_words_look_streaming() {
    let rx = b"40..00+00000215 53..00+00000900";
    let (class, _, _) = classify_response(&String::from_utf8_lossy(rx));
    assert_eq!(class, ProbeClass::Distance);
    assert!(looks_streaming(rx));
}

/// Heuristic thresholds on raw windows.
#[test]
fn test_looks_streaming() {
    assert!(looks_streaming(&[b' '; 80]));
    assert!(!looks_streaming(b"@E203\r\n"));
    assert!(looks_streaming(b"a\nb\n"));
}
