#[macro_use]
extern crate criterion;

use criterion::Criterion;

extern crate strainer;

use strainer::metric::FieldRecord;
use strainer::protocols::opentsdb::{decode, OpenTSDBDecoderConfig, OpenTSDBEncoder,
                                    OpenTSDBEncoderConfig};

fn decode_experiment(config: &OpenTSDBDecoderConfig) {
    let packet = "put sys.cpu.user 1356998400 42.5 host=webserver01 cpu=0
put sys.cpu.user 1356998400 42 host=webserver01 cpu=1
sys.if.bytes.out 1356998400 1024 host=web01 iface=eth0 dc=lga
put sys.load 1356998400 0.75";

    for line in packet.lines() {
        assert!(decode(line, config).is_ok());
    }
}

fn benchmark_decode(c: &mut Criterion) {
    let config = OpenTSDBDecoderConfig::default();
    c.bench_function("decode_opentsdb", move |b| {
        b.iter(|| decode_experiment(&config));
    });
}

fn benchmark_encode(c: &mut Criterion) {
    let config = OpenTSDBEncoderConfig {
        tagname_prefix: "_t_".to_string(),
        tags_if_missing: vec!["dc=lga".to_string()],
        tags_override: vec!["env=prod".to_string()],
        ..Default::default()
    };
    let encoder = OpenTSDBEncoder::new(&config);
    let record = FieldRecord::new("statsd.agg")
        .timestamp(1_356_998_400_000_000_000)
        .field("Metric", "sys.cpu.user_t_host.web01_t_cpu.0")
        .field("Value", 42.5)
        .field("_t_iface", "eth0");
    c.bench_function("encode_opentsdb", move |b| {
        b.iter(|| encoder.encode(&record).is_ok());
    });
}

criterion_group!(benches, benchmark_decode, benchmark_encode);
criterion_main!(benches);
