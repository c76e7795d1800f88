//! The line protocols that strainer must parse and write. These modules are
//! used by sources to decode input and by sinks to encode output.

use std::error;
use std::fmt;

pub mod graphite;
pub mod opentsdb;
pub mod statsd;

/// Failures decoding a single line. The line is dropped; the stream goes on.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The line was empty after trimming
    EmptyLine,
    /// A StatsD line had no `:` between name and value
    NoColon(String),
    /// A StatsD line had no `|` between value and modifier
    NoPipe(String),
    /// The metric name has characters outside `[A-Za-z0-9_.-]` or is empty
    InvalidName(String),
    /// The value is not a number
    InvalidValue(String),
    /// The StatsD modifier is not one of `c`, `g`, `ms`, `s`
    UnknownModifier(String),
    /// The StatsD sample rate is not a positive number
    InvalidSampleRate(String),
    /// An OpenTSDB line was at least this many bytes long
    LineTooLong(usize),
    /// An OpenTSDB line had fewer than three tokens
    TooFewTokens(String),
    /// An OpenTSDB timestamp is not an integer
    InvalidTimestamp(String),
    /// An OpenTSDB tag is not `key=value`
    MalformedTag(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::EmptyLine => write!(f, "empty line"),
            ParseError::NoColon(ref l) => write!(f, "failed to split on colon: '{}'", l),
            ParseError::NoPipe(ref l) => write!(f, "not enough pipes: '{}'", l),
            ParseError::InvalidName(ref n) => write!(f, "invalid metric name: '{}'", n),
            ParseError::InvalidValue(ref v) => write!(f, "invalid value: '{}'", v),
            ParseError::UnknownModifier(ref m) => write!(f, "unknown metric type: '{}'", m),
            ParseError::InvalidSampleRate(ref r) => {
                write!(f, "could not parse sample rate: '{}'", r)
            }
            ParseError::LineTooLong(len) => write!(f, "metric line of {} bytes exceeds 1KB", len),
            ParseError::TooFewTokens(ref l) => write!(f, "malformed metric line: '{}'", l),
            ParseError::InvalidTimestamp(ref t) => write!(f, "invalid timestamp: '{}'", t),
            ParseError::MalformedTag(ref t) => write!(f, "malformed tag: '{}'", t),
        }
    }
}

impl error::Error for ParseError {}

/// Failures encoding a record. The record is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A field the encoding requires is not on the record
    MissingField(&'static str),
    /// A field is present but of a type the encoding can't use
    InvalidField(&'static str),
    /// The record could not be serialized
    Serialization(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EncodeError::MissingField(name) => {
                write!(f, "unable to find Field[{}] in record", name)
            }
            EncodeError::InvalidField(name) => write!(f, "Field[{}] has an unusable type", name),
            EncodeError::Serialization(ref e) => write!(f, "serialization failed: {}", e),
        }
    }
}

impl error::Error for EncodeError {}
