//! OpenTSDB telnet-style `put` lines.
//!
//! A line looks like `put <metric> <unix seconds> <value> [tag=value ...]`.
//! Decoding produces a record with `Metric` and `Value` fields plus one string
//! field per tag. Encoding goes the other way and has a handful of knobs for
//! where tags come from, see `OpenTSDBEncoderConfig`.

use metric::{FieldRecord, FieldValue, TagMap, METRIC_FIELD, VALUE_FIELD};
use protocols::{EncodeError, ParseError};
use std::str::FromStr;
use time;

/// The record type set on every decoded OpenTSDB record.
pub const MESSAGE_TYPE: &'static str = "opentsdb";

/// Lines this long or longer are rejected by `decode`.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Configuration for the OpenTSDB decoder
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpenTSDBDecoderConfig {
    /// Prefix for any field derived from a tag
    pub tagname_prefix: String,
}

/// Decode a single OpenTSDB line into a `FieldRecord`
///
/// A leading `put ` is optional. The value is read as an integer if it looks
/// like one, else as a float. Non-finite values (`NaN`, `inf`) are refused.
/// The record timestamp is the line's timestamp converted to nanoseconds.
///
/// # Examples
///
/// ```
/// use strainer::metric::FieldValue;
/// use strainer::protocols::opentsdb::{decode, OpenTSDBDecoderConfig};
///
/// let config = OpenTSDBDecoderConfig::default();
/// let r = decode("put sys.cpu 1500000000 42 host=web01", &config).unwrap();
///
/// assert_eq!(r.metric_name(), Some("sys.cpu"));
/// assert_eq!(r.get("Value"), Some(&FieldValue::Integer(42)));
/// assert_eq!(r.get("host"), Some(&FieldValue::from("web01")));
/// assert_eq!(r.timestamp, 1_500_000_000_000_000_000);
/// ```
pub fn decode(line: &str, config: &OpenTSDBDecoderConfig) -> Result<FieldRecord, ParseError> {
    let line = line.trim_matches(|c: char| c == '\n' || c == '\r');
    let line = if line.starts_with("put ") {
        &line[4..]
    } else {
        line
    };

    if line.len() >= MAX_LINE_LENGTH {
        return Err(ParseError::LineTooLong(line.len()));
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ParseError::TooFewTokens(line.to_string()));
    }

    let timestamp = match i64::from_str(tokens[1])
        .ok()
        .and_then(|secs| secs.checked_mul(time::NANOS_PER_SECOND))
    {
        Some(ts) => ts,
        None => return Err(ParseError::InvalidTimestamp(tokens[1].to_string())),
    };

    // OpenTSDB checks if a value "looks like" an int before a float
    let value = match i64::from_str(tokens[2]) {
        Ok(i) => FieldValue::Integer(i),
        Err(_) => match f64::from_str(tokens[2]) {
            Ok(f) if f.is_finite() => FieldValue::Float(f),
            _ => return Err(ParseError::InvalidValue(tokens[2].to_string())),
        },
    };

    let mut record = FieldRecord::new(MESSAGE_TYPE)
        .timestamp(timestamp)
        .field(METRIC_FIELD, tokens[0])
        .field(VALUE_FIELD, value);

    for tag in &tokens[3..] {
        let mut kv = tag.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) if !k.is_empty() => {
                let mut name = String::with_capacity(config.tagname_prefix.len() + k.len());
                name.push_str(&config.tagname_prefix);
                name.push_str(k);
                record = record.field(name, v);
            }
            _ => return Err(ParseError::MalformedTag((*tag).to_string())),
        }
    }

    Ok(record)
}

/// Configuration for `OpenTSDBEncoder`
#[derive(Clone, Debug, PartialEq)]
pub struct OpenTSDBEncoderConfig {
    /// String demarcating embedded tag keys in the metric name, also the
    /// prefix selecting which fields become tags.
    pub tagname_prefix: String,
    /// String demarcating embedded tag values in the metric name. Defaults to
    /// `.` when `tagname_prefix` is set and this is left empty.
    pub tagvalue_prefix: String,
    /// Base the line timestamp on the record timestamp rather than "now".
    pub ts_from_message: bool,
    /// Turn fields carrying `tagname_prefix` into tags.
    pub fields_to_tags: bool,
    /// `k=v` tags added only when the record doesn't already have them.
    pub tags_if_missing: Vec<String>,
    /// `k=v` tags applied unconditionally.
    pub tags_override: Vec<String>,
    /// Add `host=<hostname>` when no host tag is present.
    pub add_hostname_if_missing: bool,
}

impl Default for OpenTSDBEncoderConfig {
    fn default() -> OpenTSDBEncoderConfig {
        OpenTSDBEncoderConfig {
            tagname_prefix: String::new(),
            tagvalue_prefix: String::new(),
            ts_from_message: true,
            fields_to_tags: true,
            tags_if_missing: Vec::new(),
            tags_override: Vec::new(),
            add_hostname_if_missing: false,
        }
    }
}

/// Encode records as OpenTSDB `put` lines
///
/// Tags are gathered in four layers, each only adding tags an earlier layer
/// hasn't set, save the last:
///
///  1. tags embedded in the metric name,
///  2. fields whose names carry `tagname_prefix`, prefix stripped,
///  3. the static `tags_if_missing` (then `host`, if so configured),
///  4. the static `tags_override`, which replace whatever came before.
///
/// Tags are written in the order they were first set.
pub struct OpenTSDBEncoder {
    tagname_prefix: String,
    tagvalue_prefix: String,
    ts_from_message: bool,
    fields_to_tags: bool,
    missing_tags: TagMap,
    override_tags: TagMap,
    hostname: Option<String>,
}

fn parse_static_tags(tags: &[String], what: &str) -> TagMap {
    let mut map = TagMap::default();
    for t in tags {
        let mut kv = t.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) if !k.is_empty() && !v.is_empty() => {
                map.insert(k.to_string(), v.to_string());
            }
            _ => warn!("ignoring malformed {} entry: '{}'", what, t),
        }
    }
    map
}

/// The hostname of this machine, if it can be determined
pub fn hostname() -> Option<String> {
    ::hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
}

impl OpenTSDBEncoder {
    /// Create a new OpenTSDBEncoder
    pub fn new(config: &OpenTSDBEncoderConfig) -> OpenTSDBEncoder {
        let tagvalue_prefix =
            if !config.tagname_prefix.is_empty() && config.tagvalue_prefix.is_empty() {
                ".".to_string()
            } else {
                config.tagvalue_prefix.clone()
            };
        let hostname = if config.add_hostname_if_missing {
            let name = hostname();
            if name.is_none() {
                warn!("unable to determine hostname, host tag will not be added");
            }
            name
        } else {
            None
        };
        OpenTSDBEncoder {
            tagname_prefix: config.tagname_prefix.clone(),
            tagvalue_prefix: tagvalue_prefix,
            ts_from_message: config.ts_from_message,
            fields_to_tags: config.fields_to_tags,
            missing_tags: parse_static_tags(&config.tags_if_missing, "tags_if_missing"),
            override_tags: parse_static_tags(&config.tags_override, "tags_override"),
            hostname: hostname,
        }
    }

    /// Split a record into its bare metric name and its tag list
    pub fn tags(&self, record: &FieldRecord) -> Result<(String, TagMap), EncodeError> {
        let metric = match record.get(METRIC_FIELD) {
            Some(m) => m.to_string(),
            None => return Err(EncodeError::MissingField(METRIC_FIELD)),
        };

        let mut tags = TagMap::default();
        let name = if self.tagname_prefix.is_empty() {
            metric
        } else {
            let mut parts = metric.split(self.tagname_prefix.as_str());
            let name = parts.next().unwrap_or("").to_string();
            for tag in parts {
                let mut kv = tag.splitn(2, self.tagvalue_prefix.as_str());
                if let (Some(k), Some(v)) = (kv.next(), kv.next()) {
                    if !k.is_empty() && !v.is_empty() {
                        tags.insert(k.to_string(), v.to_string());
                    }
                }
            }
            name
        };

        if self.fields_to_tags {
            for &(ref k, ref v) in record.fields.iter() {
                if k == METRIC_FIELD || k == VALUE_FIELD {
                    continue;
                }
                if k.starts_with(self.tagname_prefix.as_str()) {
                    let key = &k[self.tagname_prefix.len()..];
                    if !key.is_empty() {
                        tags.insert_if_missing(key.to_string(), v.to_string());
                    }
                }
            }
        }

        tags.merge(&self.missing_tags);
        if let Some(ref host) = self.hostname {
            tags.insert_if_missing("host".to_string(), host.clone());
        }
        for &(ref k, ref v) in self.override_tags.iter() {
            tags.insert(k.clone(), v.clone());
        }

        Ok((name, tags))
    }

    /// Encode a record, using wall-clock time if not configured to use the
    /// record's own timestamp
    pub fn encode(&self, record: &FieldRecord) -> Result<String, EncodeError> {
        self.encode_at(record, time::now())
    }

    /// Encode a record, using `now` (nanoseconds) as the line timestamp when
    /// not configured to use the record's own timestamp
    pub fn encode_at(&self, record: &FieldRecord, now: i64) -> Result<String, EncodeError> {
        let (name, tags) = self.tags(record)?;
        let value = match record.get(VALUE_FIELD) {
            Some(v) => v,
            None => return Err(EncodeError::MissingField(VALUE_FIELD)),
        };
        let timestamp = if self.ts_from_message {
            time::as_seconds(record.timestamp)
        } else {
            time::as_seconds(now)
        };

        let mut line = String::with_capacity(128);
        line.push_str("put ");
        line.push_str(&name);
        line.push(' ');
        line.push_str(&timestamp.to_string());
        line.push(' ');
        line.push_str(&value.to_string());
        for &(ref k, ref v) in tags.iter() {
            line.push(' ');
            line.push_str(k);
            line.push('=');
            line.push_str(v);
        }
        line.push('\n');
        Ok(line)
    }
}
