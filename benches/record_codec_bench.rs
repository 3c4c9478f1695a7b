//! Performance benchmarks for the card record codec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench record_codec_bench
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use waypoint_protocol::{PlayerRecord, StationMessage};

const CARD: &str = "1011010101007alice";

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("decode_card", |b| {
        b.iter(|| PlayerRecord::decode(black_box(CARD)).unwrap());
    });

    group.bench_function("parse_departure", |b| {
        b.iter(|| StationMessage::parse(black_box(CARD)).unwrap());
    });

    group.bench_function("parse_score", |b| {
        b.iter(|| StationMessage::parse(black_box("H3011010101007alice,4200")).unwrap());
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encode");
    group.throughput(Throughput::Elements(1));

    let record = PlayerRecord::decode(CARD).unwrap();
    group.bench_function("encode_card", |b| {
        b.iter(|| black_box(&record).encode());
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
