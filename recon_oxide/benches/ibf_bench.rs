//! Benchmarks for the invertible Bloom filter
//!
//! Measures record insertion, subtraction, and the peeling decoder across
//! difference sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recon_oxide::reconciliation::{ibf_parameters, Ibf, IbfConfig, KeyValueIbf};
use recon_oxide::DifferenceSets;

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("ibf_add");

    let mut ibf = Ibf::new(IbfConfig::default(), 4_096).unwrap();
    let mut id = 0u64;

    group.throughput(Throughput::Elements(1));
    group.bench_function("single_add", |b| {
        b.iter(|| {
            id = id.wrapping_add(1);
            ibf.add(black_box(id), black_box(b"record payload"));
        });
    });

    group.finish();
}

fn bench_bulk_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("ibf_bulk_fill");

    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut ibf = Ibf::new(IbfConfig::default(), size * 2).unwrap();
                for id in 0..size {
                    ibf.add(id, &id.to_le_bytes());
                }
                black_box(ibf);
            });
        });
    }

    group.finish();
}

fn bench_subtract_and_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("ibf_subtract_and_decode");

    for diff in [10u64, 100, 1_000] {
        let sizing = ibf_parameters(diff, 0);
        // wide counters: these filters carry the full sets, not just the
        // difference the sizing policy budgeted for
        let config = IbfConfig {
            hash_count: sizing.hash_count,
            ..IbfConfig::default()
        };

        let mut a = Ibf::new(config, sizing.block_size).unwrap();
        let mut b = Ibf::new(config, sizing.block_size).unwrap();
        for id in 0..10_000u64 {
            a.add(id, &id.to_le_bytes());
            b.add(id, &id.to_le_bytes());
        }
        for id in 10_000..10_000 + diff {
            a.add(id, &id.to_le_bytes());
        }

        group.throughput(Throughput::Elements(diff));
        group.bench_with_input(BenchmarkId::from_parameter(diff), &diff, |bench, _| {
            bench.iter(|| {
                let mut sets = DifferenceSets::new();
                let decoded = a.subtract_and_decode(&b, &mut sets).unwrap();
                black_box((decoded, sets));
            });
        });
    }

    group.finish();
}

fn bench_paired_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_value_ibf_decode");

    let config = IbfConfig::default();
    let mut a = KeyValueIbf::new(config, 750).unwrap();
    let mut b = KeyValueIbf::new(config, 750).unwrap();
    for id in 0..1_000u64 {
        a.add(id, &id.to_le_bytes());
        if id < 50 {
            b.add(id, &(id + 1_000_000).to_le_bytes());
        } else {
            b.add(id, &id.to_le_bytes());
        }
    }

    group.bench_function("fifty_modifications", |bench| {
        bench.iter(|| {
            let mut sets = DifferenceSets::new();
            let decoded = a.subtract_and_decode(&b, &mut sets).unwrap();
            black_box((decoded, sets));
        });
    });

    group.finish();
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("ibf_fold");

    let mut ibf = Ibf::new(IbfConfig::default(), 8_192).unwrap();
    for id in 0..500u64 {
        ibf.add(id, &id.to_le_bytes());
    }

    group.bench_function("fold_by_4", |b| {
        b.iter(|| black_box(ibf.fold(black_box(4)).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_add,
    bench_bulk_fill,
    bench_subtract_and_decode,
    bench_paired_decode,
    bench_fold
);
criterion_main!(benches);
