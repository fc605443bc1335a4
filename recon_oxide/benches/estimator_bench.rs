//! Benchmarks for the difference estimators
//!
//! Measures estimator fills and the strata/minwise/hybrid decode paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recon_oxide::estimation::{BitMinwiseEstimator, HybridEstimatorFactory, StrataEstimator};
use recon_oxide::reconciliation::IbfConfig;

fn bench_hybrid_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid_fill");

    for size in [1_000u64, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut estimator =
                    HybridEstimatorFactory::create(IbfConfig::default(), size, 0).unwrap();
                for id in 0..size {
                    estimator.add(id, &id.to_le_bytes());
                }
                black_box(estimator);
            });
        });
    }

    group.finish();
}

fn bench_strata_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("strata_decode");

    let config = IbfConfig::default();
    let mut a = StrataEstimator::new(config, 32).unwrap();
    let mut b = StrataEstimator::new(config, 32).unwrap();
    for id in 0..10_000u64 {
        a.add(id, &id.to_le_bytes());
        if id >= 100 {
            b.add(id, &id.to_le_bytes());
        }
    }

    group.bench_function("hundred_differences", |bench| {
        bench.iter(|| black_box(a.decode(&b).unwrap()));
    });

    group.finish();
}

fn bench_minwise_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("minwise_similarity");

    let mut a = BitMinwiseEstimator::new(2, 128, 10_000).unwrap();
    let mut b = BitMinwiseEstimator::new(2, 128, 10_000).unwrap();
    for id in 0..10_000u64 {
        a.add(id);
        if id % 10 != 0 {
            b.add(id);
        }
    }

    group.bench_function("compare_128_permutations", |bench| {
        bench.iter(|| black_box(a.similarity(&b).unwrap()));
    });

    group.finish();
}

fn bench_hybrid_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid_decode");

    let config = IbfConfig::default();
    let mut a = HybridEstimatorFactory::create(config, 10_000, 0).unwrap();
    let mut b = HybridEstimatorFactory::create(config, 10_000, 0).unwrap();
    for id in 0..10_000u64 {
        a.add(id, &id.to_le_bytes());
        if id >= 200 {
            b.add(id, &id.to_le_bytes());
        }
    }

    group.bench_function("two_hundred_differences", |bench| {
        bench.iter(|| black_box(a.decode(&b).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_hybrid_fill,
    bench_strata_decode,
    bench_minwise_similarity,
    bench_hybrid_decode
);
criterion_main!(benches);
