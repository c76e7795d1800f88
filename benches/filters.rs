#[macro_use]
extern crate criterion;

use criterion::Criterion;

extern crate strainer;

use strainer::filter::{AggregateFilter, AggregateFilterConfig, DedupeFilter, DedupeFilterConfig,
                       Filter};
use strainer::metric::{Event, FieldRecord};

fn statsd_events() -> Vec<Event> {
    let mut events = Vec::with_capacity(1_000);
    for i in 0..1_000 {
        let (name, modifier) = match i % 4 {
            0 => ("api.hits", "c"),
            1 => ("api.latency", "ms"),
            2 => ("queue.depth", "g"),
            _ => ("users", "s"),
        };
        events.push(Event::Record(
            FieldRecord::new("statsd")
                .timestamp(0)
                .field("Metric", name)
                .field("Value", f64::from(i % 97))
                .field("Modifier", modifier)
                .field("Sampling", 1.0),
        ));
    }
    events.push(Event::TimerFlush(10_000_000_000));
    events
}

fn bench_aggregate(c: &mut Criterion) {
    let events = statsd_events();
    c.bench_function("aggregate_1000_then_flush", move |b| {
        b.iter(|| {
            let mut aggr = AggregateFilter::new(&AggregateFilterConfig::default())
                .expect("default config is valid");
            let mut res = Vec::new();
            for ev in &events {
                let _ = aggr.process(ev.clone(), &mut res);
            }
            res.len()
        });
    });
}

fn bench_dedupe(c: &mut Criterion) {
    let mut config = DedupeFilterConfig::default();
    config.dedupe_window = 60_000_000_000;
    let records: Vec<FieldRecord> = (0..1_000)
        .map(|i: i64| {
            FieldRecord::new("opentsdb")
                .timestamp(i * 1_000_000_000)
                .field("Metric", "sys.cpu")
                .field("Value", ((i / 10) % 3) as f64)
                .field("host", if i % 2 == 0 { "a" } else { "b" })
        })
        .collect();
    c.bench_function("dedupe_1000", move |b| {
        b.iter(|| {
            let mut dedupe = DedupeFilter::new(&config);
            let mut emitted = 0;
            for r in &records {
                emitted += dedupe.ingest(r.clone()).len();
            }
            emitted
        });
    });
}

criterion_group!(benches, bench_aggregate, bench_dedupe);
criterion_main!(benches);
