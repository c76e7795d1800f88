#[macro_use]
extern crate criterion;

use criterion::Criterion;

extern crate strainer;

use strainer::protocols::statsd::decode;

fn experiment() {
    let packet = "zrth:0|g
fst:-1.1|ms
snd:+2.2|g
thd:3.3|s
fth:4|c
fvth:5.5|c|@0.1
sxth:-6.6|g
svth:+7.77|g";

    for line in packet.lines() {
        assert!(decode(line).is_ok());
    }
}

fn benchmark(c: &mut Criterion) {
    c.bench_function("decode_statsd", |b| {
        b.iter(|| experiment());
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
