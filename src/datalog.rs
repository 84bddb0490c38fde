//! # Measurement Log
//!
//! Appends decoded measurement words to a CSV file, one row per word:
//!
//! ```text
//! timestamp,token,word_index,unit_code,sign,raw,kind,value
//! 2025-03-01T14:02:11,31..00+0012345,31,00,+,12345,distance,12.345
//! 2025-03-01T14:02:12,31..00-0000250,31,00,-,250,distance,-0.25
//! ```
//!
//! `raw` is the unsigned magnitude; the sign has its own column.
//! The header is written only when the file is new or empty, so an existing
//! log can be continued across sessions. Fields never contain commas or
//! quotes (tokens are whitespace-free ASCII), so no quoting is needed.

use crate::disto::event::DistoEvent;
use crate::disto::token::MeasurementWord;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column names, in row order.
pub const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "token",
    "word_index",
    "unit_code",
    "sign",
    "raw",
    "kind",
    "value",
];

/// Appending CSV writer for measurement words.
pub struct CsvLogger {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if empty {
            writeln!(writer, "{}", CSV_HEADER.join(","))?;
            writer.flush()?;
        }
        log::info!("Logging measurements to {}", path.display());
        Ok(CsvLogger {
            path,
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written through this logger.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Appends one row and flushes it to disk.
    pub fn log_word(&mut self, timestamp: &DateTime<Local>, word: &MeasurementWord) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{}",
            timestamp.format("%Y-%m-%dT%H:%M:%S"),
            word.token,
            word.word_index,
            word.unit_code,
            word.sign.as_char(),
            word.raw_magnitude,
            word.kind.label(),
            word.value
        )?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Logs `event` if it carries a measurement word; returns whether a row was written.
    pub fn log_event(&mut self, event: &DistoEvent) -> io::Result<bool> {
        match event {
            DistoEvent::Word { timestamp, word } => {
                self.log_word(timestamp, word)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
