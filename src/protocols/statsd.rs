//! StatsD lines, `<name>:<value>|<modifier>[|@<rate>]`.

use metric::{FieldRecord, MetricKind, METRIC_FIELD, MODIFIER_FIELD, SAMPLING_FIELD,
             VALUE_FIELD};
use protocols::{EncodeError, ParseError};
use regex::Regex;
use std::str::FromStr;

/// The record type set on every decoded StatsD record.
pub const MESSAGE_TYPE: &'static str = "statsd";

lazy_static! {
    static ref NAME: Regex = Regex::new(r"^[[:alnum:]_.\-]+$").unwrap();
    static ref NUMBER: Regex =
        Regex::new(r"^[+\-]?(\d+\.?\d*|\.\d+)([eE][+\-]?\d+)?$").unwrap();
}

fn parse_number(src: &str) -> Option<f64> {
    if NUMBER.is_match(src) {
        f64::from_str(src).ok()
    } else {
        None
    }
}

/// Decode a single StatsD line into a `FieldRecord`
///
/// Valid lines are:
///
/// - `<str:metric_name>:<f64:value>|<str:modifier>`
/// - `<str:metric_name>:<f64:value>|<str:modifier>|@<f64:sample_rate>`
///
/// where the modifier is one of `c`, `g`, `ms` or `s`. The record carries the
/// fields `Metric`, `Value`, `Modifier` and `Sampling`, the last defaulting to
/// 1 when the line gives none. A third pipe-delimited segment which does not
/// start with `@` is ignored.
///
/// # Examples
///
/// ```
/// use strainer::metric::FieldValue;
/// use strainer::protocols::statsd;
///
/// let r = statsd::decode("api.hits:3|c|@0.5").unwrap();
/// assert_eq!(r.metric_name(), Some("api.hits"));
/// assert_eq!(r.value(), Some(3.0));
/// assert_eq!(r.get("Sampling"), Some(&FieldValue::Float(0.5)));
///
/// assert!(statsd::decode("bad-line-no-colon").is_err());
/// ```
pub fn decode(line: &str) -> Result<FieldRecord, ParseError> {
    let line = line.trim_matches(|c: char| c == '\n' || c == '\r');
    if line.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let colon_idx = match line.find(':') {
        Some(idx) => idx,
        None => return Err(ParseError::NoColon(line.to_string())),
    };
    let name = &line[..colon_idx];
    if !NAME.is_match(name) {
        return Err(ParseError::InvalidName(name.to_string()));
    }

    let mut parts = line[(colon_idx + 1)..].splitn(3, '|');
    let raw_value = parts.next().unwrap_or("");
    let modifier = match parts.next() {
        Some(m) => m,
        None => return Err(ParseError::NoPipe(line.to_string())),
    };
    let value = match parse_number(raw_value) {
        Some(v) => v,
        None => return Err(ParseError::InvalidValue(raw_value.to_string())),
    };
    let kind = match MetricKind::from_modifier(modifier) {
        Some(k) => k,
        None => return Err(ParseError::UnknownModifier(modifier.to_string())),
    };
    let sampling = match parts.next() {
        Some(seg) if seg.starts_with('@') => match parse_number(&seg[1..]) {
            Some(rate) if rate > 0.0 => rate,
            _ => return Err(ParseError::InvalidSampleRate(seg[1..].to_string())),
        },
        _ => 1.0,
    };

    Ok(FieldRecord::new(MESSAGE_TYPE)
        .field(METRIC_FIELD, name)
        .field(VALUE_FIELD, value)
        .field(MODIFIER_FIELD, kind.modifier())
        .field(SAMPLING_FIELD, sampling))
}

/// Encode a StatsD-shaped record as a StatsD line
///
/// The record must have `Metric`, `Value` and `Modifier` fields. The sample
/// rate is written only when the record has a `Sampling` field other than 1.
pub fn encode(record: &FieldRecord) -> Result<String, EncodeError> {
    let name = match record.get(METRIC_FIELD) {
        Some(v) => v,
        None => return Err(EncodeError::MissingField(METRIC_FIELD)),
    };
    let value = match record.get(VALUE_FIELD) {
        Some(v) => v,
        None => return Err(EncodeError::MissingField(VALUE_FIELD)),
    };
    let modifier = match record.get(MODIFIER_FIELD) {
        Some(m) => match m.as_str() {
            Some(m) => m,
            None => return Err(EncodeError::InvalidField(MODIFIER_FIELD)),
        },
        None => return Err(EncodeError::MissingField(MODIFIER_FIELD)),
    };

    let mut line = String::with_capacity(64);
    line.push_str(&name.to_string());
    line.push(':');
    line.push_str(&value.to_string());
    line.push('|');
    line.push_str(modifier);
    if let Some(rate) = record.get(SAMPLING_FIELD).and_then(|s| s.as_f64()) {
        if rate != 1.0 {
            line.push_str("|@");
            line.push_str(&rate.to_string());
        }
    }
    line.push('\n');
    Ok(line)
}
