//! StatsD-style aggregation: accumulate observations, flush statistics.
//!
//! The aggregator folds StatsD records into per-metric buckets and, on every
//! `TimerFlush`, turns each bucket into one or more statistic records named
//! `[global_prefix].[kind_prefix].<name>.<stat>`. Two self statistics,
//! `numStats` and `metrics_received`, close out every flush.

use buckets::{Accumulator, Buckets, Percentile};
use config::ConfigError;
use filter;
use metric::{Event, FieldRecord, MetricKind, Observation, ObservationError, METRIC_FIELD,
             VALUE_FIELD};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::vec;
use time;

/// Total number of observations folded into a bucket
pub static AGGR_OBSERVATION_ACCEPT: AtomicUsize = AtomicUsize::new(0);
/// Total number of observations refused for disagreeing with their bucket's
/// kind
pub static AGGR_KIND_MISMATCH: AtomicUsize = AtomicUsize::new(0);
/// Total number of records emitted by flushes
pub static AGGR_RECORDS_FLUSHED: AtomicUsize = AtomicUsize::new(0);

/// Configuration for `AggregateFilter`
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateFilterConfig {
    /// The flush interval, in seconds. Used as the elapsed period of the very
    /// first flush.
    pub ticker_interval: u64,
    /// Prefix of every emitted name
    pub global_prefix: String,
    /// Prefix of counter statistics, after the global prefix
    pub counter_prefix: String,
    /// Prefix of timer statistics, after the global prefix
    pub timer_prefix: String,
    /// Prefix of gauge statistics, after the global prefix
    pub gauge_prefix: String,
    /// Prefix of set statistics, after the global prefix
    pub set_prefix: String,
    /// Prefix of the aggregator's own statistics, after the global prefix
    pub statsd_prefix: String,
    /// Timer percentiles to report, each greater than zero
    pub percentiles: Vec<f64>,
    /// Keep buckets across flushes, reporting idle values
    pub send_idle_stats: bool,
    /// Report per-second rates for counters and timers
    pub calculate_rates: bool,
    /// The type of emitted records
    pub message_type: String,
}

impl Default for AggregateFilterConfig {
    fn default() -> AggregateFilterConfig {
        AggregateFilterConfig {
            ticker_interval: 10,
            global_prefix: String::new(),
            counter_prefix: String::new(),
            timer_prefix: String::new(),
            gauge_prefix: String::new(),
            set_prefix: String::new(),
            statsd_prefix: "statsd".to_string(),
            percentiles: vec![50.0, 75.0, 90.0, 99.0],
            send_idle_stats: false,
            calculate_rates: false,
            message_type: "statsd.agg".to_string(),
        }
    }
}

/// Errors from `AggregateFilter::ingest`
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// The observation's kind differs from the kind its bucket was created
    /// with. The bucket is unchanged.
    KindMismatch {
        /// The metric name
        name: String,
        /// The bucket's kind
        bucket: MetricKind,
        /// The refused observation's kind
        observed: MetricKind,
    },
    /// The observation's sample rate is not greater than zero
    InvalidSampleRate {
        /// The metric name
        name: String,
        /// The refused sample rate
        rate: f64,
    },
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AggregateError::KindMismatch {
                ref name,
                bucket,
                observed,
            } => write!(
                f,
                "metric '{}' is a {:?} but was observed as a {:?}",
                name, bucket, observed
            ),
            AggregateError::InvalidSampleRate { ref name, rate } => write!(
                f,
                "metric '{}' has sample rate {}, which is not greater than zero",
                name, rate
            ),
        }
    }
}

impl ::std::error::Error for AggregateError {}

/// Accumulate StatsD observations and flush derived statistics.
pub struct AggregateFilter {
    buckets: Buckets,
    percentiles: Vec<Percentile>,
    global_prefix: String,
    counter_prefix: String,
    timer_prefix: String,
    gauge_prefix: String,
    set_prefix: String,
    statsd_prefix: String,
    send_idle_stats: bool,
    calculate_rates: bool,
    message_type: String,
    ticker_interval: i64,
    last_flush: Option<i64>,
    metrics_received: u64,
}

fn join_name(parts: &[&str]) -> String {
    let mut name = String::with_capacity(64);
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(part);
    }
    name
}

impl AggregateFilter {
    /// Create a new AggregateFilter
    ///
    /// Fails if `ticker_interval` is zero or too large to express in
    /// nanoseconds, or if any percentile is not a finite number greater than
    /// zero.
    pub fn new(config: &AggregateFilterConfig) -> Result<AggregateFilter, ConfigError> {
        let ticker_interval = if config.ticker_interval == 0 {
            None
        } else {
            Some(config.ticker_interval)
                .filter(|secs| *secs <= i64::max_value() as u64)
                .and_then(|secs| (secs as i64).checked_mul(time::NANOS_PER_SECOND))
        };
        let ticker_interval = match ticker_interval {
            Some(ns) => ns,
            None => {
                return Err(ConfigError::InvalidValue(
                    "filters.aggregate.ticker_interval".to_string(),
                    format!("{} is not a positive number of seconds", config.ticker_interval),
                ))
            }
        };
        let mut percentiles = Vec::with_capacity(config.percentiles.len());
        for p in &config.percentiles {
            match Percentile::new(*p) {
                Some(pct) => percentiles.push(pct),
                None => {
                    return Err(ConfigError::InvalidValue(
                        "filters.aggregate.percentiles".to_string(),
                        format!("{} is not a percentile greater than zero", p),
                    ))
                }
            }
        }
        Ok(AggregateFilter {
            buckets: Buckets::default(),
            percentiles: percentiles,
            global_prefix: config.global_prefix.clone(),
            counter_prefix: config.counter_prefix.clone(),
            timer_prefix: config.timer_prefix.clone(),
            gauge_prefix: config.gauge_prefix.clone(),
            set_prefix: config.set_prefix.clone(),
            statsd_prefix: config.statsd_prefix.clone(),
            send_idle_stats: config.send_idle_stats,
            calculate_rates: config.calculate_rates,
            message_type: config.message_type.clone(),
            ticker_interval: ticker_interval,
            last_flush: None,
            metrics_received: 0,
        })
    }

    /// Fold a single observation into its bucket
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::filter::{AggregateFilter, AggregateFilterConfig};
    /// use strainer::metric::{MetricKind, Observation};
    ///
    /// let mut aggr = AggregateFilter::new(&AggregateFilterConfig::default()).unwrap();
    /// assert!(aggr.ingest(Observation::new("a", 1.0, MetricKind::Counter)).is_ok());
    /// assert!(aggr.ingest(Observation::new("a", 1.0, MetricKind::Timer)).is_err());
    /// assert_eq!(1, aggr.metrics_received());
    /// ```
    pub fn ingest(&mut self, obs: Observation) -> Result<(), AggregateError> {
        if !(obs.sample_rate > 0.0) {
            return Err(AggregateError::InvalidSampleRate {
                name: obs.name,
                rate: obs.sample_rate,
            });
        }
        match self.buckets.add(&obs) {
            Ok(()) => {
                self.metrics_received += 1;
                AGGR_OBSERVATION_ACCEPT.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(bucket) => {
                AGGR_KIND_MISMATCH.fetch_add(1, Ordering::Relaxed);
                Err(AggregateError::KindMismatch {
                    name: obs.name,
                    bucket: bucket,
                    observed: obs.kind,
                })
            }
        }
    }

    /// Total observations accepted over the life of the filter
    pub fn metrics_received(&self) -> u64 {
        self.metrics_received
    }

    /// The number of live buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn kind_prefix(&self, kind: MetricKind) -> &str {
        match kind {
            MetricKind::Counter => self.counter_prefix.as_str(),
            MetricKind::Gauge => self.gauge_prefix.as_str(),
            MetricKind::Timer => self.timer_prefix.as_str(),
            MetricKind::Set => self.set_prefix.as_str(),
        }
    }

    fn record(&self, now: i64, name: String, value: f64) -> FieldRecord {
        FieldRecord::new(self.message_type.as_str())
            .timestamp(now)
            .field(METRIC_FIELD, name)
            .field(VALUE_FIELD, value)
    }

    fn bucket_records(
        &self,
        now: i64,
        elapsed_secs: f64,
        name: &str,
        acc: &Accumulator,
    ) -> Vec<FieldRecord> {
        let prefix = self.kind_prefix(acc.kind());
        acc.summarize(elapsed_secs, &self.percentiles, self.calculate_rates)
            .into_iter()
            .map(|(suffix, value)| {
                let full = join_name(&[self.global_prefix.as_str(), prefix, name, suffix.as_str()]);
                self.record(now, full, value)
            })
            .collect()
    }

    /// Convert accumulated state into statistic records
    ///
    /// `now` is in nanoseconds. The elapsed period is the time since the last
    /// flush, or the ticker interval for the first flush. If it is not
    /// positive the flush does nothing. Buckets are emitted in name order,
    /// followed by `numStats` and `metrics_received`. Every bucket's
    /// statistics are computed before any bucket is reset.
    pub fn flush(&mut self, now: i64) -> vec::IntoIter<FieldRecord> {
        let elapsed = match self.last_flush {
            Some(last) => now.checked_sub(last).unwrap_or(i64::max_value()),
            None => self.ticker_interval,
        };
        if elapsed <= 0 {
            debug!("skipping flush at {}, elapsed {}ns", now, elapsed);
            if self.last_flush.is_none() {
                self.last_flush = Some(now);
            }
            return Vec::new().into_iter();
        }
        let elapsed_secs = elapsed as f64 / time::NANOS_PER_SECOND as f64;

        let mut records = Vec::new();
        for (name, acc) in self.buckets.sorted() {
            records.extend(self.bucket_records(now, elapsed_secs, name, acc));
        }
        let num_stats = join_name(&[
            self.global_prefix.as_str(),
            self.statsd_prefix.as_str(),
            "numStats",
        ]);
        records.push(self.record(now, num_stats, self.buckets.len() as f64));
        let received = join_name(&[
            self.global_prefix.as_str(),
            self.statsd_prefix.as_str(),
            "metrics_received",
        ]);
        records.push(self.record(now, received, self.metrics_received as f64));

        if self.send_idle_stats {
            self.buckets.reset_idle();
        } else {
            self.buckets.reset();
        }
        self.last_flush = Some(now);
        AGGR_RECORDS_FLUSHED.fetch_add(records.len(), Ordering::Relaxed);
        records.into_iter()
    }
}

impl filter::Filter for AggregateFilter {
    fn process(&mut self, event: Event, res: &mut Vec<Event>) -> Result<(), filter::FilterError> {
        match event {
            Event::Record(record) => {
                let obs = match Observation::from_record(&record) {
                    Ok(obs) => obs,
                    Err(ObservationError::MissingField(f)) => {
                        return Err(filter::FilterError::MissingField(f, Event::Record(record)))
                    }
                    Err(ObservationError::InvalidField(f)) => {
                        return Err(filter::FilterError::InvalidField(f, Event::Record(record)))
                    }
                };
                if let Err(e) = self.ingest(obs) {
                    warn!("{}", e);
                }
            }
            Event::TimerFlush(now) => {
                res.extend(self.flush(now).map(Event::Record));
                res.push(Event::TimerFlush(now));
            }
            Event::Shutdown => {
                res.extend(self.flush(time::now()).map(Event::Record));
                info!(
                    "aggregate shutting down, {} observations accepted, {} kind mismatches, {} records flushed",
                    AGGR_OBSERVATION_ACCEPT.load(Ordering::Relaxed),
                    AGGR_KIND_MISMATCH.load(Ordering::Relaxed),
                    AGGR_RECORDS_FLUSHED.load(Ordering::Relaxed)
                );
                res.push(Event::Shutdown);
            }
        }
        Ok(())
    }
}
