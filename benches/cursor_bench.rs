//! Cursor combinator micro-benchmarks
//!
//! Walks compiled expressions over a populated index: raw set scans, the
//! round-robin intersection, the inverse-rewritten difference and the
//! exponential count estimator.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use tagdex::{Expr, IndexConfig, SliceOptions, TopicIndex};

const TOPICS: u64 = 50_000;

fn build_index() -> TopicIndex {
    let index = TopicIndex::new(IndexConfig::default());
    for id in 1..=TOPICS {
        let ts = 1_000_000 + (id as u32 % 10_000);
        // Tag 1 everywhere, tag 2 on half, tag 3 on every third topic
        index.add_tags(id, ts, &[1]);
        if id % 2 == 0 {
            index.add_tags(id, ts, &[2]);
        }
        if id % 3 == 0 {
            index.add_tags(id, ts, &[3]);
        }
    }
    index
}

fn parse(value: Value) -> Expr {
    Expr::parse(&value).expect("expression")
}

fn bench_cursors(c: &mut Criterion) {
    let index = build_index();
    let full_walk = SliceOptions::new(usize::MAX);
    let page = SliceOptions::new(20);
    let estimate = SliceOptions::new(20).with_estimate(true);

    c.bench_function("slice_basic_page", |b| {
        let expr = parse(json!(1));
        b.iter(|| black_box(index.slice(&expr, &page).expect("slice")));
    });

    c.bench_function("slice_intersection_walk", |b| {
        let expr = parse(json!(["intersection", 2, 3]));
        b.iter(|| black_box(index.slice(&expr, &full_walk).expect("slice")));
    });

    c.bench_function("slice_union_walk", |b| {
        let expr = parse(json!(["union", 2, 3]));
        b.iter(|| black_box(index.slice(&expr, &full_walk).expect("slice")));
    });

    c.bench_function("slice_difference_walk", |b| {
        let expr = parse(json!(["difference", 1, 2]));
        b.iter(|| black_box(index.slice(&expr, &full_walk).expect("slice")));
    });

    c.bench_function("slice_estimate", |b| {
        let expr = parse(json!(1));
        b.iter(|| black_box(index.slice(&expr, &estimate).expect("slice")));
    });
}

criterion_group!(benches, bench_cursors);
criterion_main!(benches);
