//! Performance benchmarks for position key allocation
//!
//! Run with: `cargo bench -p tabular-core`
//!
//! Position keys sit on every row create and move, so key generation has to
//! stay cheap even after many splits of the same gap have grown the keys.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tabular_core::db::PositionAllocator;

fn bench_append_chain(c: &mut Criterion) {
    c.bench_function("append 1000 keys", |b| {
        b.iter(|| {
            let mut last: Option<String> = None;
            for _ in 0..1000 {
                let key =
                    PositionAllocator::key_between(last.as_deref(), None).unwrap();
                last = Some(key);
            }
            black_box(last)
        })
    });
}

fn bench_same_gap_splits(c: &mut Criterion) {
    c.bench_function("split one gap 100 times", |b| {
        b.iter(|| {
            let lo = PositionAllocator::key_between(None, None).unwrap();
            let mut hi = PositionAllocator::key_between(Some(&lo), None).unwrap();
            for _ in 0..100 {
                hi = PositionAllocator::key_between(Some(&lo), Some(&hi)).unwrap();
            }
            black_box(hi)
        })
    });
}

fn bench_jittered_append(c: &mut Criterion) {
    c.bench_function("jittered append", |b| {
        let lo = PositionAllocator::key_between(None, None).unwrap();
        b.iter(|| {
            black_box(PositionAllocator::jittered_key_between(Some(&lo), None).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_append_chain,
    bench_same_gap_splits,
    bench_jittered_append
);
criterion_main!(benches);
