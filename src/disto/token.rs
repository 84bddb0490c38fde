//! # ONLINE Token Parser
//!
//! Decodes the whitespace-delimited words the DISTO emits in ONLINE mode, using
//! the `nom` crate for the fixed lexical pattern:
//!
//! ```text
//! 31..00+00012345
//! ^^             word index (2 digits)
//!   ^^           literal ".."
//!     ^^         unit code (2 digits)
//!       ^        sign
//!        ^^^^^^^^ magnitude (5-10 digits)
//! ```
//!
//! Anything that does not match the whole pattern is not an error. The
//! protocol is undocumented and noisy, so `parse_token` simply returns `None`
//! and the caller reports the text as unparsed.
//!
//! ## Usage
//!
//! ```rust
//! use disto_rs::disto::token::{parse_token, WordKind};
//!
//! let word = parse_token("31..00+0012345").unwrap();
//! assert_eq!(word.kind, WordKind::Distance);
//! assert!((word.value - 12.345).abs() < 1e-9);
//! assert!(parse_token("@E203").is_none());
//! ```

use crate::constants::{
    ERROR_PREFIX, IDLE_MARKER, STATUS_PREFIX, UNIT_MILLIMETERS, WI_DISTANCE, WI_SIGNAL,
    WI_TEMPERATURE,
};
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::one_of;
use nom::combinator::all_consuming;
use nom::sequence::tuple;
use nom::IResult;
use serde::Serialize;
use std::fmt;

/// Sign character of a measurement word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    /// Multiplier applied to the raw magnitude.
    pub fn factor(self) -> i64 {
        match self {
            Sign::Positive => 1,
            Sign::Negative => -1,
        }
    }

    /// The wire character.
    pub fn as_char(self) -> char {
        match self {
            Sign::Positive => '+',
            Sign::Negative => '-',
        }
    }
}

/// Semantic meaning of a measurement word, derived from its word index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordKind {
    /// Word index 31 with unit code `00`; value in meters.
    Distance,
    /// Word index 40; value in degrees Celsius.
    Temperature,
    /// Word index 53; value in millivolts.
    Signal,
    /// A known word index carrying a unit code we cannot scale.
    UnknownUnit(u8),
    /// Any other word index; value is the raw magnitude.
    Unknown(u8),
}

impl WordKind {
    /// Short label used in logs and CSV rows.
    pub fn label(&self) -> String {
        match self {
            WordKind::Distance => "distance".to_string(),
            WordKind::Temperature => "temperature".to_string(),
            WordKind::Signal => "signal".to_string(),
            WordKind::UnknownUnit(wi) => format!("wi{wi}-unknown-unit"),
            WordKind::Unknown(wi) => format!("wi{wi}"),
        }
    }
}

/// A decoded measurement token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementWord {
    /// The token exactly as received.
    pub token: String,
    pub word_index: u8,
    pub unit_code: String,
    pub sign: Sign,
    pub raw_magnitude: u64,
    pub kind: WordKind,
    pub value: f64,
}

impl MeasurementWord {
    /// Signed raw value (magnitude with the sign applied).
    pub fn signed_raw(&self) -> i64 {
        self.sign.factor() * self.raw_magnitude as i64
    }
}

impl fmt::Display for MeasurementWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WordKind::Distance => write!(f, "{:.3} m", self.value),
            WordKind::Temperature => write!(f, "{:.1} °C", self.value),
            WordKind::Signal => write!(f, "{} mV", self.signed_raw()),
            WordKind::UnknownUnit(_) | WordKind::Unknown(_) => f.write_str(&self.token),
        }
    }
}

fn digits(min: usize, max: usize) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| take_while_m_n(min, max, |c: char| c.is_ascii_digit())(input)
}

fn word_fields(input: &str) -> IResult<&str, (&str, &str, &str, char, &str)> {
    all_consuming(tuple((
        digits(2, 2),
        tag(".."),
        digits(2, 2),
        one_of("+-"),
        digits(5, 10),
    )))(input)
}

/// Derives kind and value from the decoded fields. Pure in its inputs.
fn derive_value(word_index: u8, unit_code: &str, sign: Sign, raw: u64) -> (WordKind, f64) {
    let signed = (sign.factor() * raw as i64) as f64;
    match word_index {
        WI_DISTANCE if unit_code == UNIT_MILLIMETERS => (WordKind::Distance, signed / 1000.0),
        WI_DISTANCE => (WordKind::UnknownUnit(word_index), signed),
        WI_TEMPERATURE => (WordKind::Temperature, signed / 10.0),
        WI_SIGNAL => (WordKind::Signal, signed),
        other => (WordKind::Unknown(other), raw as f64),
    }
}

/// Parses one whitespace-free token into a [`MeasurementWord`].
///
/// Returns `None` for anything that is not a whole-token match, including the
/// empty string, `?` and status reports such as `@E203`.
pub fn parse_token(token: &str) -> Option<MeasurementWord> {
    let (_, (wi, _, unit, sign, magnitude)) = word_fields(token).ok()?;

    // two ASCII digits always fit; ten digits always fit in u64
    let word_index: u8 = wi.parse().ok()?;
    let raw_magnitude: u64 = magnitude.parse().ok()?;
    let sign = if sign == '-' {
        Sign::Negative
    } else {
        Sign::Positive
    };
    let (kind, value) = derive_value(word_index, unit, sign, raw_magnitude);

    Some(MeasurementWord {
        token: token.to_string(),
        word_index,
        unit_code: unit.to_string(),
        sign,
        raw_magnitude,
        kind,
        value,
    })
}

/// Classification of a device status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// The bare `?` idle/acknowledge marker.
    Ok,
    /// An `@...` report that is not an error code.
    Status,
    /// An `@E...` error report.
    Error,
}

/// A received line, classified before tokenizing.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    /// Nothing but whitespace.
    Empty,
    /// `?` or an `@...` report.
    Status { text: &'a str, kind: StatusKind },
    /// Whitespace-separated tokens to run through [`parse_token`].
    Tokens(Vec<&'a str>),
}

/// Classifies a raw line: trims it, recognizes status lines, else splits tokens.
pub fn classify_line(raw: &str) -> Line<'_> {
    let text = raw.trim();
    if text.is_empty() {
        Line::Empty
    } else if text == IDLE_MARKER {
        Line::Status {
            text,
            kind: StatusKind::Ok,
        }
    } else if text.starts_with(STATUS_PREFIX) {
        let kind = if text.starts_with(ERROR_PREFIX) {
            StatusKind::Error
        } else {
            StatusKind::Status
        };
        Line::Status { text, kind }
    } else {
        Line::Tokens(text.split_whitespace().collect())
    }
}

/// Counts the tokens in a chunk of text that have the measurement word shape,
/// whatever their word index.
pub fn count_distance_tokens(text: &str) -> usize {
    text.split_whitespace()
        .filter(|t| parse_token(t).is_some())
        .count()
}
