//! The data types that flow through strainer.
//!
//! Decoders turn lines into `FieldRecord`s, filters consume and produce
//! `Event`s and encoders turn `FieldRecord`s back into lines. The aggregator
//! additionally understands `Observation`s, the StatsD view of a record.

mod fieldmap;
mod observation;
mod record;
mod value;

pub use self::fieldmap::FieldMap;
pub use self::observation::{MetricKind, Observation, ObservationError};
pub use self::record::FieldRecord;
pub use self::value::FieldValue;

/// The field map of a `FieldRecord`.
pub type Fields = FieldMap<String, FieldValue>;

/// An ordered key / value tag list, as written by the OpenTSDB encoder.
pub type TagMap = FieldMap<String, String>;

/// Name of the field holding the metric name.
pub const METRIC_FIELD: &'static str = "Metric";
/// Name of the field holding the metric value.
pub const VALUE_FIELD: &'static str = "Value";
/// Name of the field holding the StatsD modifier.
pub const MODIFIER_FIELD: &'static str = "Modifier";
/// Name of the field holding the StatsD sample rate.
pub const SAMPLING_FIELD: &'static str = "Sampling";

/// Supreme sum type for things that flow through filters.
#[derive(PartialEq, Debug, Serialize, Clone)]
pub enum Event {
    /// A decoded or derived record
    Record(FieldRecord),
    /// A periodic flush tick. The value is the tick time in nanoseconds.
    TimerFlush(i64),
    /// Drain any held state and stop
    Shutdown,
}
