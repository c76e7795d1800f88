use metric::{FieldValue, Fields};
use time;

/// FieldRecord - the generic parsed unit flowing between codecs and filters
///
/// A FieldRecord holds a typed field map plus envelope data: when the record
/// happened, what kind of record it is and, optionally, the raw bytes it was
/// decoded from. Field names are unique within a record.
#[derive(PartialEq, Debug, Serialize, Clone)]
pub struct FieldRecord {
    /// The time that this record occupies, in nanoseconds since the epoch
    pub timestamp: i64,
    /// The record type, for instance "statsd" or "statsd.agg"
    #[serde(rename = "type")]
    pub message_type: String,
    /// The fields of the record, in insertion order
    pub fields: Fields,
    /// The raw line this record was decoded from, if any. Not serialized.
    #[serde(skip_serializing)]
    pub payload: Option<Vec<u8>>,
}

impl FieldRecord {
    /// Create a new, empty FieldRecord stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::metric::FieldRecord;
    ///
    /// let r = FieldRecord::new("statsd").field("Metric", "foo").field("Value", 1.5);
    ///
    /// assert_eq!(r.message_type, "statsd");
    /// assert_eq!(r.metric_name(), Some("foo"));
    /// assert_eq!(r.value(), Some(1.5));
    /// ```
    pub fn new<S>(message_type: S) -> FieldRecord
    where
        S: Into<String>,
    {
        FieldRecord {
            timestamp: time::now(),
            message_type: message_type.into(),
            fields: Default::default(),
            payload: None,
        }
    }

    /// Set the timestamp of the FieldRecord, in nanoseconds
    pub fn timestamp(mut self, ts: i64) -> FieldRecord {
        self.timestamp = ts;
        self
    }

    /// Insert a field into the FieldRecord
    ///
    /// If a field of the same name already exists its value is replaced but
    /// its position in the field ordering is kept.
    pub fn field<S, V>(mut self, name: S, value: V) -> FieldRecord
    where
        S: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attach the raw bytes this record was derived from
    pub fn payload(mut self, bytes: Vec<u8>) -> FieldRecord {
        self.payload = Some(bytes);
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The `Metric` field, if present and a string
    pub fn metric_name(&self) -> Option<&str> {
        self.get(::metric::METRIC_FIELD).and_then(|v| v.as_str())
    }

    /// The `Value` field, if present and numeric
    pub fn value(&self) -> Option<f64> {
        self.get(::metric::VALUE_FIELD).and_then(|v| v.as_f64())
    }
}
