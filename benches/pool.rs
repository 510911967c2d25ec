//! Benchmarks for the candidate pool.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use repair_search::engine::{CandidatePool, UniformSelector};

fn bench_pool_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_build");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut rng = StdRng::seed_from_u64(0);
            b.iter(|| {
                let candidates = (0..size).map(|i| (i % 257, i));
                black_box(CandidatePool::from_candidates(candidates, &mut rng))
            });
        });
    }

    group.finish();
}

fn bench_pool_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_drain");

    for locations in [1, 64, 4096] {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = CandidatePool::from_candidates((0..50_000).map(|i| (i % locations, i)), &mut rng);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{} locations", locations)),
            &pool,
            |b, pool| {
                b.iter(|| {
                    let mut pool = pool.clone();
                    while let Some(candidate) = pool.pop(&UniformSelector, &mut rng) {
                        black_box(candidate);
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pool_build, bench_pool_drain);
criterion_main!(benches);
