//! Buckets are the primary internal storage type of the aggregator.
//!
//! Each metric name maps to one accumulator whose kind is fixed by the first
//! observation for that name. Accumulators know how to summarize themselves
//! into named statistics at flush time; they never emit records on their own.

use metric::{MetricKind, Observation};
use seahash::SeaHasher;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

/// HashMap keyed with seahash, used for all aggregator and dedupe state
pub type HashMapSea<K, V> = HashMap<K, V, BuildHasherDefault<SeaHasher>>;
/// HashSet keyed with seahash
pub type HashSetSea<K> = HashSet<K, BuildHasherDefault<SeaHasher>>;

/// A percentile the aggregator reports for timers, with its stat suffix
#[derive(Debug, Clone, PartialEq)]
pub struct Percentile {
    /// The percentile, greater than zero
    pub value: f64,
    /// Rendered suffix, `90` for 90 or `99_9` for 99.9
    pub suffix: String,
}

impl Percentile {
    /// Create a new percentile, `None` if `value` is not a finite number
    /// greater than zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::buckets::Percentile;
    ///
    /// assert_eq!("90", Percentile::new(90.0).unwrap().suffix);
    /// assert_eq!("99_9", Percentile::new(99.9).unwrap().suffix);
    /// assert!(Percentile::new(0.0).is_none());
    /// ```
    pub fn new(value: f64) -> Option<Percentile> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(Percentile {
            value: value,
            suffix: value.to_string().replace('.', "_"),
        })
    }
}

/// Per-metric accumulated state
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Running, sample-rate compensated sum
    Counter(f64),
    /// Last value seen
    Gauge(f64),
    /// Raw samples in arrival order
    Timer(Vec<f64>),
    /// Distinct values, held as their bit patterns
    Set(HashSetSea<u64>),
}

fn set_key(value: f64) -> u64 {
    // 0.0 and -0.0 are the same member
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Round half up, as StatsD does
#[inline]
fn round(x: f64) -> f64 {
    (x + 0.5).floor()
}

impl Accumulator {
    /// Create an empty accumulator of the given kind
    pub fn new(kind: MetricKind) -> Accumulator {
        match kind {
            MetricKind::Counter => Accumulator::Counter(0.0),
            MetricKind::Gauge => Accumulator::Gauge(0.0),
            MetricKind::Timer => Accumulator::Timer(Vec::new()),
            MetricKind::Set => Accumulator::Set(HashSetSea::default()),
        }
    }

    /// The kind of this accumulator
    pub fn kind(&self) -> MetricKind {
        match *self {
            Accumulator::Counter(_) => MetricKind::Counter,
            Accumulator::Gauge(_) => MetricKind::Gauge,
            Accumulator::Timer(_) => MetricKind::Timer,
            Accumulator::Set(_) => MetricKind::Set,
        }
    }

    /// Fold an observation into the accumulator. The caller guarantees the
    /// kinds agree.
    fn add(&mut self, obs: &Observation) {
        match *self {
            Accumulator::Counter(ref mut sum) => *sum += obs.value * (1.0 / obs.sample_rate),
            Accumulator::Gauge(ref mut last) => *last = obs.value,
            Accumulator::Timer(ref mut samples) => samples.push(obs.value),
            Accumulator::Set(ref mut members) => {
                members.insert(set_key(obs.value));
            }
        }
    }

    /// Reset to the idle state: counters to zero, timers and sets emptied,
    /// gauges untouched
    fn reset_idle(&mut self) {
        match *self {
            Accumulator::Counter(ref mut sum) => *sum = 0.0,
            Accumulator::Gauge(_) => {}
            Accumulator::Timer(ref mut samples) => samples.clear(),
            Accumulator::Set(ref mut members) => members.clear(),
        }
    }

    /// Summarize the accumulator into `(suffix, value)` statistics
    ///
    /// An empty suffix means the statistic is named after the metric itself.
    /// `elapsed_secs` must be positive. The accumulator is not modified.
    pub fn summarize(
        &self,
        elapsed_secs: f64,
        percentiles: &[Percentile],
        calculate_rates: bool,
    ) -> Vec<(String, f64)> {
        let mut stats = Vec::new();
        match *self {
            Accumulator::Counter(sum) => {
                stats.push(("count".to_string(), sum));
                if calculate_rates {
                    stats.push(("rate".to_string(), sum / elapsed_secs));
                }
            }
            Accumulator::Gauge(last) => stats.push((String::new(), last)),
            Accumulator::Set(ref members) => stats.push((String::new(), members.len() as f64)),
            Accumulator::Timer(ref samples) => {
                if samples.is_empty() {
                    return stats;
                }
                let mut sorted = samples.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(::std::cmp::Ordering::Equal));

                let count = sorted.len();
                // cumsum[i] is the sum of the i smallest samples
                let mut cumsum = Vec::with_capacity(count + 1);
                cumsum.push(0.0);
                for (i, v) in sorted.iter().enumerate() {
                    let prev = cumsum[i];
                    cumsum.push(prev + v);
                }
                let sum = cumsum[count];

                stats.push(("count".to_string(), count as f64));
                stats.push(("lower".to_string(), sorted[0]));
                stats.push(("upper".to_string(), sorted[count - 1]));
                stats.push(("sum".to_string(), sum));
                stats.push(("mean".to_string(), sum / count as f64));
                if calculate_rates {
                    stats.push(("rate".to_string(), count as f64 / elapsed_secs));
                }

                for pct in percentiles {
                    let n = count as f64;
                    let idx = n - round(((100.0 - pct.value) / 100.0) * n);
                    if idx < 1.0 || idx > n {
                        continue;
                    }
                    let idx = idx as usize;
                    stats.push((format!("mean_{}", pct.suffix), cumsum[idx] / idx as f64));
                    stats.push((format!("sum_{}", pct.suffix), cumsum[idx]));
                    stats.push((format!("upper_{}", pct.suffix), sorted[idx - 1]));
                }
            }
        }
        stats
    }
}

/// Buckets stores all accumulators until they are flushed.
#[derive(Debug, Default)]
pub struct Buckets {
    accumulators: HashMapSea<String, Accumulator>,
}

impl Buckets {
    /// Adds an observation to the bucket storage
    ///
    /// The first observation for a name fixes that bucket's kind. An
    /// observation of a different kind is refused and the bucket's existing
    /// kind returned as the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use strainer::buckets::Buckets;
    /// use strainer::metric::{MetricKind, Observation};
    ///
    /// let mut buckets = Buckets::default();
    /// assert!(buckets.add(&Observation::new("foo", 1.0, MetricKind::Counter)).is_ok());
    /// assert_eq!(
    ///     Err(MetricKind::Counter),
    ///     buckets.add(&Observation::new("foo", 1.0, MetricKind::Gauge))
    /// );
    /// ```
    pub fn add(&mut self, obs: &Observation) -> Result<(), MetricKind> {
        if let Some(acc) = self.accumulators.get_mut(&obs.name) {
            if acc.kind() != obs.kind {
                return Err(acc.kind());
            }
            acc.add(obs);
            return Ok(());
        }
        let mut acc = Accumulator::new(obs.kind);
        acc.add(obs);
        self.accumulators.insert(obs.name.clone(), acc);
        Ok(())
    }

    /// Look up the accumulator for `name`
    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.accumulators.get(name)
    }

    /// The number of buckets
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    /// Determine if there are no buckets
    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    /// All buckets, ordered by metric name
    pub fn sorted(&self) -> Vec<(&String, &Accumulator)> {
        let mut all: Vec<(&String, &Accumulator)> = self.accumulators.iter().collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    /// Drop every bucket
    pub fn reset(&mut self) {
        self.accumulators.clear();
    }

    /// Return every bucket to its idle state, see `Accumulator`
    pub fn reset_idle(&mut self) {
        for acc in self.accumulators.values_mut() {
            acc.reset_idle();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::{MetricKind, Observation};
    use quickcheck::{QuickCheck, TestResult};

    fn stat(stats: &[(String, f64)], name: &str) -> Option<f64> {
        stats.iter().find(|s| s.0 == name).map(|s| s.1)
    }

    fn pcts(ps: &[f64]) -> Vec<Percentile> {
        ps.iter().map(|p| Percentile::new(*p).unwrap()).collect()
    }

    #[test]
    fn test_add_counter_metric() {
        let mut buckets = Buckets::default();
        let metric = Observation::new("some.metric", 1.0, MetricKind::Counter);
        buckets.add(&metric).unwrap();
        assert_eq!(Some(&Accumulator::Counter(1.0)), buckets.get("some.metric"));

        buckets.add(&metric).unwrap();
        assert_eq!(Some(&Accumulator::Counter(2.0)), buckets.get("some.metric"));
        assert_eq!(1, buckets.len());
    }

    #[test]
    fn test_counter_sample_rate() {
        let mut buckets = Buckets::default();
        buckets
            .add(&Observation::new("c", 1.0, MetricKind::Counter).sample_rate(0.1))
            .unwrap();
        assert_eq!(Some(&Accumulator::Counter(10.0)), buckets.get("c"));
    }

    #[test]
    fn test_gauge_last_value_wins() {
        let mut buckets = Buckets::default();
        for v in &[1.0, 7.0, 3.0] {
            buckets.add(&Observation::new("g", *v, MetricKind::Gauge)).unwrap();
        }
        assert_eq!(Some(&Accumulator::Gauge(3.0)), buckets.get("g"));
    }

    #[test]
    fn test_set_distinct_members() {
        let mut buckets = Buckets::default();
        for v in &[1.0, 2.0, 1.0, 0.0, -0.0] {
            buckets.add(&Observation::new("s", *v, MetricKind::Set)).unwrap();
        }
        let stats = buckets.get("s").unwrap().summarize(1.0, &[], false);
        assert_eq!(vec![(String::new(), 3.0)], stats);
    }

    #[test]
    fn test_kind_mismatch_leaves_bucket_alone() {
        let mut buckets = Buckets::default();
        buckets.add(&Observation::new("m", 2.0, MetricKind::Counter)).unwrap();
        assert_eq!(
            Err(MetricKind::Counter),
            buckets.add(&Observation::new("m", 9.0, MetricKind::Timer))
        );
        assert_eq!(Some(&Accumulator::Counter(2.0)), buckets.get("m"));
    }

    #[test]
    fn test_timer_summary() {
        let mut acc = Accumulator::new(MetricKind::Timer);
        for v in &[10.0, 1.0, 9.0, 2.0, 8.0, 3.0, 7.0, 4.0, 6.0, 5.0] {
            acc.add(&Observation::new("t", *v, MetricKind::Timer));
        }
        let stats = acc.summarize(10.0, &pcts(&[90.0]), true);
        assert_eq!(Some(10.0), stat(&stats, "count"));
        assert_eq!(Some(1.0), stat(&stats, "lower"));
        assert_eq!(Some(10.0), stat(&stats, "upper"));
        assert_eq!(Some(55.0), stat(&stats, "sum"));
        assert_eq!(Some(5.5), stat(&stats, "mean"));
        assert_eq!(Some(1.0), stat(&stats, "rate"));
        assert_eq!(Some(9.0), stat(&stats, "upper_90"));
        assert_eq!(Some(45.0), stat(&stats, "sum_90"));
        assert_eq!(Some(5.0), stat(&stats, "mean_90"));
    }

    #[test]
    fn test_timer_percentile_out_of_range_skipped() {
        let mut acc = Accumulator::new(MetricKind::Timer);
        for v in 1..11 {
            acc.add(&Observation::new("t", f64::from(v), MetricKind::Timer));
        }
        // idx = 10 - round(9.9) = 0 and 10 - round(-5) = 15
        let stats = acc.summarize(1.0, &pcts(&[1.0, 150.0, 100.0]), false);
        assert_eq!(None, stat(&stats, "upper_1"));
        assert_eq!(None, stat(&stats, "upper_150"));
        assert_eq!(Some(10.0), stat(&stats, "upper_100"));
        assert_eq!(Some(55.0), stat(&stats, "sum_100"));
    }

    #[test]
    fn test_empty_timer_summarizes_to_nothing() {
        let acc = Accumulator::new(MetricKind::Timer);
        assert!(acc.summarize(1.0, &pcts(&[50.0]), true).is_empty());
    }

    #[test]
    fn test_reset_idle() {
        let mut buckets = Buckets::default();
        buckets.add(&Observation::new("c", 5.0, MetricKind::Counter)).unwrap();
        buckets.add(&Observation::new("g", 42.0, MetricKind::Gauge)).unwrap();
        buckets.add(&Observation::new("t", 1.0, MetricKind::Timer)).unwrap();
        buckets.add(&Observation::new("s", 1.0, MetricKind::Set)).unwrap();
        buckets.reset_idle();

        assert_eq!(4, buckets.len());
        assert_eq!(Some(&Accumulator::Counter(0.0)), buckets.get("c"));
        assert_eq!(Some(&Accumulator::Gauge(42.0)), buckets.get("g"));
        assert_eq!(Some(&Accumulator::Timer(vec![])), buckets.get("t"));
        assert_eq!(Some(&Accumulator::Set(HashSetSea::default())), buckets.get("s"));

        buckets.reset();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_sorted_is_by_name() {
        let mut buckets = Buckets::default();
        for name in &["zz", "aa", "mm"] {
            buckets.add(&Observation::new(*name, 1.0, MetricKind::Gauge)).unwrap();
        }
        let names: Vec<&str> = buckets.sorted().iter().map(|x| x.0.as_str()).collect();
        assert_eq!(vec!["aa", "mm", "zz"], names);
    }

    #[test]
    fn counters_sum_their_values() {
        fn inner(vals: Vec<i32>) -> TestResult {
            if vals.is_empty() {
                return TestResult::discard();
            }
            let mut buckets = Buckets::default();
            let mut total = 0.0;
            for v in &vals {
                let v = f64::from(*v);
                total += v;
                buckets.add(&Observation::new("c", v, MetricKind::Counter)).unwrap();
            }
            assert_eq!(Some(&Accumulator::Counter(total)), buckets.get("c"));
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<i32>) -> TestResult);
    }

    #[test]
    fn timer_stats_are_ordered() {
        fn inner(vals: Vec<i32>, p: u8) -> TestResult {
            if vals.is_empty() || p == 0 || p >= 100 {
                return TestResult::discard();
            }
            let mut acc = Accumulator::new(MetricKind::Timer);
            for v in &vals {
                acc.add(&Observation::new("t", f64::from(*v), MetricKind::Timer));
            }
            let pct = pcts(&[f64::from(p)]);
            let stats = acc.summarize(1.0, &pct, false);
            let lower = stat(&stats, "lower").unwrap();
            let upper = stat(&stats, "upper").unwrap();
            let mean = stat(&stats, "mean").unwrap();
            assert_eq!(Some(vals.len() as f64), stat(&stats, "count"));
            assert!(lower <= mean + 1e-9 && mean <= upper + 1e-9);
            if let Some(upper_p) = stat(&stats, &format!("upper_{}", p)) {
                assert!(lower <= upper_p && upper_p <= upper);
                let mean_p = stat(&stats, &format!("mean_{}", p)).unwrap();
                assert!(mean_p <= upper_p + 1e-9);
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<i32>, u8) -> TestResult);
    }
}
