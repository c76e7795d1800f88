//! Graphite plaintext output, one `<name> <value> <unix seconds>` per line.

use metric::{FieldRecord, METRIC_FIELD, VALUE_FIELD};
use protocols::EncodeError;
use time;

/// Encode a record as a graphite plaintext line
///
/// The record timestamp is truncated to whole seconds.
///
/// # Examples
///
/// ```
/// use strainer::metric::FieldRecord;
/// use strainer::protocols::graphite;
///
/// let r = FieldRecord::new("statsd.agg")
///     .timestamp(101_500_000_000)
///     .field("Metric", "stats.api.count")
///     .field("Value", 5.0);
/// assert_eq!("stats.api.count 5 101\n", graphite::encode(&r).unwrap());
/// ```
pub fn encode(record: &FieldRecord) -> Result<String, EncodeError> {
    let name = match record.get(METRIC_FIELD) {
        Some(n) => n,
        None => return Err(EncodeError::MissingField(METRIC_FIELD)),
    };
    let value = match record.get(VALUE_FIELD) {
        Some(v) => match v.as_f64() {
            Some(v) => v,
            None => return Err(EncodeError::InvalidField(VALUE_FIELD)),
        },
        None => return Err(EncodeError::MissingField(VALUE_FIELD)),
    };
    Ok(format!(
        "{} {} {}\n",
        name,
        value,
        time::as_seconds(record.timestamp)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lines() {
        let pyld = [("fst", 1.0, 101), ("snd", -2.5, 202), ("s-th", 6.0, 606)];
        let mut out = String::new();
        for &(name, value, secs) in &pyld {
            let r = FieldRecord::new("statsd.agg")
                .timestamp(secs * 1_000_000_000)
                .field("Metric", name)
                .field("Value", value);
            out.push_str(&encode(&r).unwrap());
        }
        assert_eq!("fst 1 101\nsnd -2.5 202\ns-th 6 606\n", out);
    }

    #[test]
    fn test_encode_integer_value() {
        let r = FieldRecord::new("opentsdb")
            .timestamp(0)
            .field("Metric", "m")
            .field("Value", 12i64);
        assert_eq!(Ok("m 12 0\n".to_string()), encode(&r));
    }

    #[test]
    fn test_encode_errors() {
        let r = FieldRecord::new("x").field("Value", 1.0);
        assert_eq!(Err(EncodeError::MissingField("Metric")), encode(&r));
        let r = FieldRecord::new("x").field("Metric", "m").field("Value", "high");
        assert_eq!(Err(EncodeError::InvalidField("Value")), encode(&r));
    }
}
