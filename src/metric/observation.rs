use metric::{FieldRecord, METRIC_FIELD, MODIFIER_FIELD, SAMPLING_FIELD, VALUE_FIELD};
use std::fmt;

/// The StatsD metric kinds understood by the aggregator.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Summed, sample-rate compensated. StatsD modifier `c`.
    Counter,
    /// Last value wins. StatsD modifier `g`.
    Gauge,
    /// Every sample retained for histogram statistics. StatsD modifier `ms`.
    Timer,
    /// Distinct values counted. StatsD modifier `s`.
    Set,
}

impl MetricKind {
    /// Map a StatsD modifier onto its kind
    pub fn from_modifier(modifier: &str) -> Option<MetricKind> {
        match modifier {
            "c" => Some(MetricKind::Counter),
            "g" => Some(MetricKind::Gauge),
            "ms" => Some(MetricKind::Timer),
            "s" => Some(MetricKind::Set),
            _ => None,
        }
    }

    /// The StatsD modifier of this kind
    pub fn modifier(&self) -> &'static str {
        match *self {
            MetricKind::Counter => "c",
            MetricKind::Gauge => "g",
            MetricKind::Timer => "ms",
            MetricKind::Set => "s",
        }
    }
}

/// One ingested data point
///
/// Observations are ephemeral. They are built per ingest call and are not
/// retained by the aggregator beyond the value they contribute to a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The metric name, the key of the bucket this observation lands in
    pub name: String,
    /// The observed value
    pub value: f64,
    /// The kind of the observation
    pub kind: MetricKind,
    /// The client-side sample rate, in `(0, 1]` for sampled counters
    pub sample_rate: f64,
}

/// Failures converting a `FieldRecord` into an `Observation`
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationError {
    /// The named field is absent
    MissingField(&'static str),
    /// The named field is present but not usable
    InvalidField(&'static str),
}

impl fmt::Display for ObservationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ObservationError::MissingField(name) => write!(f, "missing field '{}'", name),
            ObservationError::InvalidField(name) => write!(f, "invalid field '{}'", name),
        }
    }
}

impl Observation {
    /// Make a new observation with a sample rate of 1
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::metric::{MetricKind, Observation};
    ///
    /// let o = Observation::new("foo", 1.0, MetricKind::Counter).sample_rate(0.1);
    ///
    /// assert_eq!(o.name, "foo");
    /// assert_eq!(o.sample_rate, 0.1);
    /// ```
    pub fn new<S>(name: S, value: f64, kind: MetricKind) -> Observation
    where
        S: Into<String>,
    {
        Observation {
            name: name.into(),
            value: value,
            kind: kind,
            sample_rate: 1.0,
        }
    }

    /// Set the sample rate of the observation
    pub fn sample_rate(mut self, rate: f64) -> Observation {
        self.sample_rate = rate;
        self
    }

    /// Build an observation from a StatsD-shaped record
    ///
    /// The record must carry `Metric`, `Value` and `Modifier` fields. The
    /// `Sampling` field is optional and defaults to 1. A sample rate that is
    /// not strictly positive is rejected.
    pub fn from_record(record: &FieldRecord) -> Result<Observation, ObservationError> {
        let name = match record.get(METRIC_FIELD) {
            Some(v) => v.as_str()
                .ok_or(ObservationError::InvalidField(METRIC_FIELD))?,
            None => return Err(ObservationError::MissingField(METRIC_FIELD)),
        };
        let value = match record.get(VALUE_FIELD) {
            Some(v) => v.as_f64().ok_or(ObservationError::InvalidField(VALUE_FIELD))?,
            None => return Err(ObservationError::MissingField(VALUE_FIELD)),
        };
        let kind = match record.get(MODIFIER_FIELD) {
            Some(v) => v.as_str()
                .and_then(MetricKind::from_modifier)
                .ok_or(ObservationError::InvalidField(MODIFIER_FIELD))?,
            None => return Err(ObservationError::MissingField(MODIFIER_FIELD)),
        };
        let sample_rate = match record.get(SAMPLING_FIELD) {
            Some(v) => v.as_f64()
                .ok_or(ObservationError::InvalidField(SAMPLING_FIELD))?,
            None => 1.0,
        };
        if !(sample_rate > 0.0) {
            return Err(ObservationError::InvalidField(SAMPLING_FIELD));
        }
        Ok(Observation::new(name, value, kind).sample_rate(sample_rate))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn modifiers_round_trip() {
        for kind in &[
            MetricKind::Counter,
            MetricKind::Gauge,
            MetricKind::Timer,
            MetricKind::Set,
        ] {
            assert_eq!(Some(*kind), MetricKind::from_modifier(kind.modifier()));
        }
        assert_eq!(None, MetricKind::from_modifier("h"));
    }

    #[test]
    fn from_record_defaults_sampling() {
        let r = FieldRecord::new("statsd")
            .field("Metric", "foo")
            .field("Value", 2.0)
            .field("Modifier", "c");
        let o = Observation::from_record(&r).unwrap();
        assert_eq!(o, Observation::new("foo", 2.0, MetricKind::Counter));
    }

    #[test]
    fn from_record_reports_missing_fields() {
        let r = FieldRecord::new("statsd").field("Metric", "foo").field("Value", 2.0);
        assert_eq!(
            Err(ObservationError::MissingField("Modifier")),
            Observation::from_record(&r)
        );
        let r = FieldRecord::new("statsd").field("Value", 2.0).field("Modifier", "c");
        assert_eq!(
            Err(ObservationError::MissingField("Metric")),
            Observation::from_record(&r)
        );
    }

    #[test]
    fn from_record_rejects_bad_sampling() {
        let r = FieldRecord::new("statsd")
            .field("Metric", "foo")
            .field("Value", 2.0)
            .field("Modifier", "c")
            .field("Sampling", 0.0);
        assert_eq!(
            Err(ObservationError::InvalidField("Sampling")),
            Observation::from_record(&r)
        );
    }

    #[test]
    fn from_record_rejects_unknown_modifier() {
        let r = FieldRecord::new("statsd")
            .field("Metric", "foo")
            .field("Value", 2.0)
            .field("Modifier", "h");
        assert_eq!(
            Err(ObservationError::InvalidField("Modifier")),
            Observation::from_record(&r)
        );
    }
}
