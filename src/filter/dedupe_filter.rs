//! Drop repeated data points while keeping graphs honest.
//!
//! Records are grouped by a key built from their invariant fields. A record
//! whose variant fields match the last emitted record for its key, and which
//! arrives within `dedupe_window` of it, is withheld. When the run of repeats
//! ends, by a change or by the window running out, the last withheld record
//! is emitted ahead of the new one so the slope between them survives.

use buckets::HashMapSea;
use filter;
use metric::{Event, FieldRecord, FieldValue, METRIC_FIELD, VALUE_FIELD};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Total number of records withheld as duplicates
pub static DEDUPE_WITHHELD: AtomicUsize = AtomicUsize::new(0);
/// Total number of records emitted
pub static DEDUPE_EMITTED: AtomicUsize = AtomicUsize::new(0);

/// Configuration for `DedupeFilter`
#[derive(Clone, Debug, PartialEq)]
pub struct DedupeFilterConfig {
    /// Longest run, in nanoseconds, over which repeats are withheld. Zero or
    /// less disables deduplication.
    pub dedupe_window: i64,
    /// Fields compared to detect change
    pub variant_fields: Vec<String>,
    /// Fields forming the dedupe key. When empty every field that is neither
    /// variant nor the key field is used.
    pub invariant_fields: Vec<String>,
    /// A field holding a precomputed dedupe key
    pub dedupe_key_field: Option<String>,
    /// Prefix of the self statistics
    pub stats_prefix: String,
    /// The type of self statistics records
    pub message_type: String,
    /// With deduplication disabled, pass records through rather than drop
    /// them
    pub pass_through_when_disabled: bool,
}

impl Default for DedupeFilterConfig {
    fn default() -> DedupeFilterConfig {
        DedupeFilterConfig {
            dedupe_window: 0,
            variant_fields: vec![VALUE_FIELD.to_string()],
            invariant_fields: Vec::new(),
            dedupe_key_field: None,
            stats_prefix: "heka.dedupe".to_string(),
            message_type: "heka.dedupe.stats".to_string(),
            pass_through_when_disabled: false,
        }
    }
}

#[derive(Debug)]
struct DedupeState {
    variant: Vec<Option<FieldValue>>,
    timestamp: i64,
    pending: FieldRecord,
    skipped: bool,
}

/// Withhold records whose variant fields repeat within a window.
pub struct DedupeFilter {
    window: i64,
    variant_fields: Vec<String>,
    invariant_fields: Vec<String>,
    key_field: Option<String>,
    stats_prefix: String,
    message_type: String,
    pass_through: bool,
    states: HashMapSea<String, DedupeState>,
    saved: u64,
}

fn same_values(lhs: &[Option<FieldValue>], rhs: &[Option<FieldValue>]) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs.iter()).all(|pair| match pair {
        (&Some(ref l), &Some(ref r)) => l.same_as(r),
        (&None, &None) => true,
        _ => false,
    })
}

impl DedupeFilter {
    /// Create a new DedupeFilter
    pub fn new(config: &DedupeFilterConfig) -> DedupeFilter {
        if config.dedupe_window <= 0 {
            if config.pass_through_when_disabled {
                info!("dedupe window is zero, records pass through unchanged");
            } else {
                warn!("dedupe window is zero, every record will be dropped");
            }
        }
        DedupeFilter {
            window: config.dedupe_window,
            variant_fields: config.variant_fields.clone(),
            invariant_fields: config.invariant_fields.clone(),
            key_field: config.dedupe_key_field.clone(),
            stats_prefix: config.stats_prefix.clone(),
            message_type: config.message_type.clone(),
            pass_through: config.pass_through_when_disabled,
            states: HashMapSea::default(),
            saved: 0,
        }
    }

    fn is_invariant(&self, name: &str) -> bool {
        if self.invariant_fields.is_empty() {
            !self.variant_fields.iter().any(|f| f == name)
                && self.key_field.as_ref().map_or(true, |k| k != name)
        } else {
            self.invariant_fields.iter().any(|f| f == name)
        }
    }

    /// The dedupe key of a record
    ///
    /// Either the value of the key field, if configured and present, or the
    /// invariant fields rendered `name=value`, sorted and joined with `:`.
    /// Values are rendered with `Display`, so `Float(1.0)` and `Integer(1)`
    /// produce the same key.
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::filter::{DedupeFilter, DedupeFilterConfig};
    /// use strainer::metric::FieldRecord;
    ///
    /// let dedupe = DedupeFilter::new(&DedupeFilterConfig::default());
    /// let r = FieldRecord::new("x")
    ///     .field("Metric", "cpu")
    ///     .field("host", "a")
    ///     .field("Value", 1.0);
    /// assert_eq!("Metric=cpu:host=a", dedupe.key(&r));
    /// ```
    pub fn key(&self, record: &FieldRecord) -> String {
        if let Some(ref kf) = self.key_field {
            if let Some(key) = record.get(kf) {
                return key.to_string();
            }
        }
        let mut parts: Vec<String> = record
            .fields
            .iter()
            .filter(|&&(ref name, _)| self.is_invariant(name))
            .map(|&(ref name, ref value)| format!("{}={}", name, value))
            .collect();
        parts.sort();
        parts.join(":")
    }

    fn variant_values(&self, record: &FieldRecord) -> Vec<Option<FieldValue>> {
        self.variant_fields
            .iter()
            .map(|name| record.get(name).cloned())
            .collect()
    }

    /// Process one record, returning the records to emit in order
    ///
    /// The result holds no records when `record` is withheld, the record
    /// itself when it starts a new run, or the last withheld record followed
    /// by `record` when it ends one.
    pub fn ingest(&mut self, record: FieldRecord) -> Vec<FieldRecord> {
        if self.window <= 0 {
            return if self.pass_through {
                vec![record]
            } else {
                Vec::new()
            };
        }

        let key = self.key(&record);
        let variant = self.variant_values(&record);
        let window = self.window;
        let mut out = Vec::with_capacity(2);

        if let Some(state) = self.states.get_mut(&key) {
            // an unrepresentable gap is past any window
            let within_window = record
                .timestamp
                .checked_sub(state.timestamp)
                .map_or(false, |gap| gap < window);
            if within_window && same_values(&state.variant, &variant) {
                // the window clock keeps the time of the last emitted point
                state.pending = record;
                state.variant = variant;
                state.skipped = true;
                self.saved += 1;
                DEDUPE_WITHHELD.fetch_add(1, Ordering::Relaxed);
                return out;
            }
            if state.skipped {
                out.push(state.pending.clone());
            }
            state.variant = variant;
            state.timestamp = record.timestamp;
            state.pending = record.clone();
            state.skipped = false;
            out.push(record);
        } else {
            self.states.insert(
                key,
                DedupeState {
                    variant: variant,
                    timestamp: record.timestamp,
                    pending: record.clone(),
                    skipped: false,
                },
            );
            out.push(record);
        }
        DEDUPE_EMITTED.fetch_add(out.len(), Ordering::Relaxed);
        out
    }

    /// Records withheld so far
    pub fn saved(&self) -> u64 {
        self.saved
    }

    /// Distinct keys currently tracked
    pub fn buffer_size(&self) -> usize {
        self.states.len()
    }

    /// The `saved` and `buffer_size` self statistics, stamped `now`
    pub fn stats(&self, now: i64) -> Vec<FieldRecord> {
        let stat = |name: &str, value: f64| {
            FieldRecord::new(self.message_type.as_str())
                .timestamp(now)
                .field(METRIC_FIELD, format!("{}.{}", self.stats_prefix, name))
                .field(VALUE_FIELD, value)
        };
        vec![
            stat("saved", self.saved as f64),
            stat("buffer_size", self.states.len() as f64),
        ]
    }

    /// Release every withheld record, ordered by key
    pub fn drain_withheld(&mut self) -> Vec<FieldRecord> {
        let mut withheld: Vec<(&String, &mut DedupeState)> = self
            .states
            .iter_mut()
            .filter(|&(_, ref s)| s.skipped)
            .collect();
        withheld.sort_by(|a, b| a.0.cmp(b.0));
        withheld
            .into_iter()
            .map(|(_, state)| {
                state.skipped = false;
                state.pending.clone()
            })
            .collect()
    }
}

impl filter::Filter for DedupeFilter {
    fn process(&mut self, event: Event, res: &mut Vec<Event>) -> Result<(), filter::FilterError> {
        match event {
            Event::Record(record) => {
                res.extend(self.ingest(record).into_iter().map(Event::Record));
            }
            Event::TimerFlush(now) => {
                res.extend(self.stats(now).into_iter().map(Event::Record));
                res.push(Event::TimerFlush(now));
            }
            Event::Shutdown => {
                let withheld = self.drain_withheld();
                if !withheld.is_empty() {
                    debug!("releasing {} withheld records at shutdown", withheld.len());
                }
                res.extend(withheld.into_iter().map(Event::Record));
                info!(
                    "dedupe shutting down, {} records withheld, {} emitted",
                    DEDUPE_WITHHELD.load(Ordering::Relaxed),
                    DEDUPE_EMITTED.load(Ordering::Relaxed)
                );
                res.push(Event::Shutdown);
            }
        }
        Ok(())
    }
}
