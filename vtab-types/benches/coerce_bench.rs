//! Per-value cost of the string coercion path.
//!
//! Run:
//!   cargo bench -p vtab-types --bench coerce_bench

#![forbid(unsafe_code)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use vtab_types::{ScalarKind, coerce};

const NUM_VALUES: usize = 10_000;

fn bench_coerce(c: &mut Criterion) {
    let ints: Vec<String> = (0..NUM_VALUES as i64).map(|i| (i * 7919).to_string()).collect();
    let decimals: Vec<String> = (0..NUM_VALUES).map(|i| format!("{i}.{:02}", i % 100)).collect();
    let stamps: Vec<String> = (0..NUM_VALUES)
        .map(|i| format!("2024-{:02}-{:02} {:02}:{:02}:00", i % 12 + 1, i % 28 + 1, i % 24, i % 60))
        .collect();

    let mut group = c.benchmark_group("coerce_10k");

    group.bench_function("int", |b| {
        b.iter(|| {
            for text in &ints {
                black_box(coerce(Some(text), ScalarKind::Long).ok());
            }
        })
    });

    group.bench_function("decimal", |b| {
        b.iter(|| {
            for text in &decimals {
                black_box(coerce(Some(text), ScalarKind::Decimal).ok());
            }
        })
    });

    group.bench_function("timestamp", |b| {
        b.iter(|| {
            for text in &stamps {
                black_box(coerce(Some(text), ScalarKind::Timestamp).ok());
            }
        })
    });

    group.bench_function("null", |b| {
        b.iter(|| {
            for _ in 0..NUM_VALUES {
                black_box(coerce(None, ScalarKind::Int).ok());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_coerce);
criterion_main!(benches);
