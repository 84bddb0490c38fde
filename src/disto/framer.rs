//! # Line Assembler
//!
//! Incremental line splitter for the DISTO byte stream. The device mixes
//! `\r\n`, `\n` and bare `\r` terminators, and serial reads split lines at
//! arbitrary points, so partial data is kept in a `BytesMut` buffer between
//! calls to [`LineAssembler::feed`].
//!
//! A `\r` that ends a chunk is emitted immediately; if the next chunk starts
//! with `\n` that byte is swallowed, so a `\r\n` split across two reads still
//! counts as one terminator. The output therefore does not depend on how the
//! stream was chunked.
//!
//! ## Usage
//!
//! ```rust
//! use disto_rs::disto::framer::LineAssembler;
//!
//! let mut assembler = LineAssembler::new();
//! assert_eq!(assembler.feed(b"31..00+0010").count(), 0);
//! let lines: Vec<String> = assembler.feed(b"00\r\n").collect();
//! assert_eq!(lines, vec!["31..00+001000".to_string()]);
//! ```

use crate::constants::MAX_LINE_LEN;
use bytes::{Buf, BytesMut};
use log::warn;

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug)]
pub struct LineAssembler {
    buffer: BytesMut,
    /// The previous line ended with a `\r` at the very end of the buffer.
    skip_lf: bool,
    max_line_len: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }

    /// Creates an assembler that splits lines longer than `max_line_len` bytes into `max_line_len` pieces.
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        LineAssembler {
            buffer: BytesMut::with_capacity(256),
            skip_lf: false,
            max_line_len: max_line_len.max(1),
        }
    }

    /// Appends `bytes` and returns an iterator over the lines completed so far.
    ///
    /// Lines are decoded permissively (invalid UTF-8 becomes U+FFFD) and are
    /// not trimmed. Lines not pulled from the iterator stay buffered and are
    /// returned by the next `feed` or [`LineAssembler::lines`].
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(bytes);
        Lines { assembler: self }
    }

    /// Iterates over complete lines already in the buffer without adding data.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { assembler: self }
    }

    /// Number of buffered bytes not yet yielded.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drops all buffered data.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.skip_lf = false;
    }

    /// Emits the first `max_line_len` bytes of an overlong line. The cut
    /// points are multiples of `max_line_len` from the line start, however
    /// the input was chunked.
    fn cut_overlong(&mut self) -> String {
        warn!(
            "Line exceeded {} bytes, splitting",
            self.max_line_len
        );
        let part = self.buffer.split_to(self.max_line_len);
        String::from_utf8_lossy(&part).into_owned()
    }

    fn next_line(&mut self) -> Option<String> {
        if self.skip_lf && !self.buffer.is_empty() {
            if self.buffer[0] == b'\n' {
                self.buffer.advance(1);
            }
            self.skip_lf = false;
        }

        let terminator = self.buffer.iter().position(|&b| b == b'\r' || b == b'\n');
        match terminator {
            Some(pos) if pos > self.max_line_len => Some(self.cut_overlong()),
            Some(pos) => {
                let line = self.buffer.split_to(pos);
                let terminator_len = match (self.buffer[0], self.buffer.get(1).copied()) {
                    (b'\r', Some(b'\n')) => 2,
                    (b'\r', None) => {
                        self.skip_lf = true;
                        1
                    }
                    _ => 1,
                };
                self.buffer.advance(terminator_len);
                Some(String::from_utf8_lossy(&line).into_owned())
            }
            None if self.buffer.len() > self.max_line_len => Some(self.cut_overlong()),
            None => None,
        }
    }
}

/// Lazy iterator over the complete lines of a [`LineAssembler`].
pub struct Lines<'a> {
    assembler: &'a mut LineAssembler,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.assembler.next_line()
    }
}

/// Counts line terminators the way the assembler would split them (`\r\n` counts once).
pub fn count_terminators(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                count += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => count += 1,
            _ => {}
        }
        i += 1;
    }
    count
}
