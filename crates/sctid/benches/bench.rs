use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use sctid::{
    ComponentCategory, GenerationStrategy, IdentifierAllocator, MemoryStore, Namespace,
    NoReservations, RandomStrategy, Sctid, SequentialStrategy, validate,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

// Number of IDs produced per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

fn bench_codec(c: &mut Criterion) {
    let namespace = Namespace::new("1000154").unwrap();
    let ids: Vec<String> = (1..=TOTAL_IDS as u64)
        .map(|item_id| {
            Sctid::build(item_id, namespace, ComponentCategory::Concept)
                .unwrap()
                .into_string()
        })
        .collect();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("build/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for item_id in 1..=TOTAL_IDS as u64 {
                black_box(Sctid::build(
                    black_box(item_id),
                    namespace,
                    ComponentCategory::Concept,
                ))
                .unwrap();
            }
        });
    });

    group.bench_function(format!("parse/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for id in &ids {
                black_box(Sctid::parse(black_box(id))).unwrap();
            }
        });
    });

    group.bench_function(format!("validate/elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for id in &ids {
                assert!(validate(black_box(id)));
            }
        });
    });

    group.finish();
}

/// Benchmarks single `generate` calls against a fresh store each iteration.
fn bench_generate<G>(c: &mut Criterion, group_name: &str, strategy_factory: impl Fn() -> G)
where
    G: GenerationStrategy,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let mut elapsed = core::time::Duration::ZERO;
            for _ in 0..iters {
                let allocator = IdentifierAllocator::new(
                    MemoryStore::new(),
                    strategy_factory(),
                    NoReservations,
                );
                let start = Instant::now();
                for _ in 0..TOTAL_IDS {
                    black_box(
                        allocator
                            .generate(Namespace::INTERNATIONAL, ComponentCategory::Concept)
                            .unwrap(),
                    );
                }
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.bench_function(format!("generate_many/elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let mut elapsed = core::time::Duration::ZERO;
            for _ in 0..iters {
                let allocator = IdentifierAllocator::new(
                    MemoryStore::new(),
                    strategy_factory(),
                    NoReservations,
                );
                let start = Instant::now();
                black_box(
                    allocator
                        .generate_many(
                            Namespace::INTERNATIONAL,
                            ComponentCategory::Concept,
                            TOTAL_IDS,
                        )
                        .unwrap(),
                );
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.finish();
}

/// Benchmarks contended generation from several threads sharing one
/// allocator.
fn bench_generate_threaded<G>(
    c: &mut Criterion,
    group_name: &str,
    strategy_factory: impl Fn() -> G,
) where
    G: GenerationStrategy,
{
    let mut group = c.benchmark_group(group_name);
    for threads in [2, 4, 8, 16] {
        group.throughput(Throughput::Elements((TOTAL_IDS * threads) as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{threads}"), |b| {
            b.iter_custom(|iters| {
                let mut elapsed = core::time::Duration::ZERO;
                for _ in 0..iters {
                    let allocator = IdentifierAllocator::new(
                        MemoryStore::new(),
                        strategy_factory(),
                        NoReservations,
                    );
                    let barrier = Arc::new(Barrier::new(threads + 1));
                    let start = scope(|s| {
                        for _ in 0..threads {
                            let barrier = Arc::clone(&barrier);
                            let allocator = &allocator;
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..TOTAL_IDS {
                                    black_box(
                                        allocator
                                            .generate(
                                                Namespace::INTERNATIONAL,
                                                ComponentCategory::Concept,
                                            )
                                            .unwrap(),
                                    );
                                }
                            });
                        }
                        barrier.wait();
                        Instant::now()
                    });
                    elapsed += start.elapsed();
                }
                elapsed
            });
        });
    }
    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    bench_codec(c);
}

fn benchmark_sequential(c: &mut Criterion) {
    bench_generate(c, "sequential", SequentialStrategy::new);
    bench_generate_threaded(c, "sequential/threaded", SequentialStrategy::new);
}

fn benchmark_random(c: &mut Criterion) {
    bench_generate(c, "random", RandomStrategy::new);
    bench_generate_threaded(c, "random/threaded", RandomStrategy::new);
}

criterion_group!(
    benches,
    benchmark_codec,
    benchmark_sequential,
    benchmark_random
);
criterion_main!(benches);
