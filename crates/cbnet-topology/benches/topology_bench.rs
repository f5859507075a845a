//! Benchmarks for CBNet topology
//!
//! Measures performance of:
//! - Weight index increments and range queries
//! - Balanced tree construction
//! - Subtree pricing (computed ranges + one range query)
//! - Routing walks between far-apart nodes

use cbnet_topology::{NodeId, Side, Tree, WeightTree};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SIZES: [usize; 4] = [128, 1024, 8192, 65_536];

/// Weight index with every leaf hit a few times
fn loaded_weights(size: usize) -> WeightTree {
    let mut weights = WeightTree::new(size);
    for leaf in 0..size {
        for _ in 0..(leaf % 5) {
            weights.increment(leaf);
        }
    }
    weights
}

/// Benchmark single-leaf increments
fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("weight_increment");

    for &size in &SIZES {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            let mut weights = WeightTree::new(n);
            let mut leaf = 0;
            b.iter(|| {
                weights.increment(black_box(leaf));
                leaf = (leaf + 7) % n;
            })
        });
    }
    group.finish();
}

/// Benchmark range sums over the middle half of the ids
fn bench_range_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("weight_range_sum");

    for &size in &SIZES {
        let weights = loaded_weights(size);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &weights, |b, w| {
            b.iter(|| w.range_sum(black_box(size / 4), black_box(3 * size / 4)))
        });
    }
    group.finish();
}

/// Benchmark balanced construction
fn bench_balanced_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("balanced_build");

    for &size in &SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| Tree::balanced(black_box(n)))
        });
    }
    group.finish();
}

/// Benchmark real and hypothetical subtree weights
fn bench_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");

    for &size in &SIZES {
        let tree = Tree::balanced(size);
        let weights = loaded_weights(size);
        let root = tree.root();
        let Some(root_id) = root else { continue };
        let candidate = tree.left(root_id).and_then(|l| tree.right(l));

        group.bench_with_input(BenchmarkId::new("weight", size), &size, |b, _| {
            b.iter(|| tree.weight(&weights, black_box(root)))
        });
        group.bench_with_input(BenchmarkId::new("hypothetical", size), &size, |b, _| {
            b.iter(|| tree.hypothetical_weight(&weights, root_id, black_box(candidate), Side::Left))
        });
    }
    group.finish();
}

/// Benchmark a full routing walk from the smallest to the largest id
fn bench_routing_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing_walk");

    for &size in &SIZES {
        let tree = Tree::balanced(size);
        let (src, dst) = (NodeId(1), NodeId(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| tree.distance(black_box(src), black_box(dst)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_increment,
    bench_range_sum,
    bench_balanced_build,
    bench_pricing,
    bench_routing_walk,
);

criterion_main!(benches);
