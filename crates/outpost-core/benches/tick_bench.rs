//! Criterion benchmarks for the session tick.
//!
//! - `tick`: graph evaluation plus rate application for factories of 10,
//!   100 and 500 miner -> smelter chains.
//! - `save`: snapshot and JSON encode of a 100-chain factory.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use outpost_core::test_utils::*;
use std::hint::black_box;

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for chains in [10usize, 100, 500] {
        let mut session = build_factory(chains);
        group.bench_with_input(BenchmarkId::from_parameter(chains), &chains, |b, _| {
            b.iter(|| black_box(session.tick(black_box(1.0 / 60.0))));
        });
    }
    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let session = build_factory(100);
    c.bench_function("save/100_chains", |b| {
        b.iter(|| {
            let snapshot = session.save_snapshot_at(0);
            black_box(snapshot.to_json().unwrap())
        });
    });
}

criterion_group!(benches, bench_tick, bench_save);
criterion_main!(benches);
