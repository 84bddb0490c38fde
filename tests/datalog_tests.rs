//! Tests for the CSV measurement log.

use disto_rs::datalog::{CsvLogger, CSV_HEADER};
use disto_rs::{parse_token, DistoEvent};
use std::io::Write;
use tempfile::NamedTempFile;

/// Appending to a file that already has content does not repeat the header.
#[test]
fn test_append_to_existing_log() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", CSV_HEADER.join(",")).unwrap();
    file.flush().unwrap();

    let mut logger = CsvLogger::open(file.path()).unwrap();
    let event = DistoEvent::Word {
        timestamp: chrono::Local::now(),
        word: parse_token("31..00-0000250").unwrap(),
    };
    assert!(logger.log_event(&event).unwrap());

    let content = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(content.matches("timestamp,").count(), 1);
    let row = content.lines().nth(1).unwrap();
    assert!(row.ends_with(",31..00-0000250,31,00,-,250,distance,-0.25"));
}

/// A new file gets the header before the first row.
#[test]
fn test_new_file_gets_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d8.csv");
    let mut logger = CsvLogger::open(&path).unwrap();
    let word = parse_token("40..00+00000215").unwrap();
    logger.log_word(&chrono::Local::now(), &word).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("timestamp,token,word_index,unit_code,sign,raw,kind,value"));
    assert!(lines.next().unwrap().ends_with(",temperature,21.5"));
}
