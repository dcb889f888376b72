//! gcsim Benchmarks
//!
//! Per-strategy cost of the core operations and of whole workloads.
//! Run with: `cargo bench --package gcsim`

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use gcsim::scenario::generate;
use gcsim::{Collector, GarbageCollector, GcConfig, NullSink, ObjectId, Simulator, Strategy};

const CAPACITY: usize = 64 * 1024 * 1024;

fn create_gc(strategy: Strategy) -> GarbageCollector {
    let config = GcConfig::default()
        .with_strategy(strategy)
        .with_capacity(CAPACITY);
    GarbageCollector::new(config, Box::new(NullSink)).unwrap()
}

/// Rooted chain of `len` objects, returned with its ids
fn rooted_chain(strategy: Strategy, len: usize) -> (GarbageCollector, Vec<ObjectId>) {
    let mut gc = create_gc(strategy);
    let ids: Vec<ObjectId> = (0..len).map(|_| gc.allocate(64).unwrap()).collect();
    gc.mark_root(ids[0]).unwrap();
    for pair in ids.windows(2) {
        gc.add_reference(pair[0], pair[1]).unwrap();
    }
    (gc, ids)
}

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");
    group.throughput(Throughput::Elements(1000));

    for strategy in Strategy::ALL {
        group.bench_function(strategy.as_str(), |b| {
            b.iter_batched(
                || create_gc(strategy),
                |mut gc| {
                    for _ in 0..1000 {
                        black_box(gc.allocate(64).unwrap());
                    }
                    gc
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_teardown");

    for len in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(len as u64));
        for strategy in Strategy::ALL {
            group.bench_with_input(BenchmarkId::new(strategy.as_str(), len), &len, |b, &len| {
                b.iter_batched(
                    || rooted_chain(strategy, len),
                    |(mut gc, ids)| {
                        gc.unmark_root(ids[0]).unwrap();
                        black_box(gc.collect())
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_leak_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("leak_scan");

    for strategy in Strategy::ALL {
        group.bench_function(strategy.as_str(), |b| {
            b.iter_batched(
                || rooted_chain(strategy, 1_000),
                |(mut gc, _)| black_box(gc.detect_leaks()),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_workloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("workloads");
    let scenarios = [
        generate::linear_chain(1_000),
        generate::cyclic_graph(1_000, 3),
        generate::cascade_tree(1_000, 3),
    ];

    for scenario in &scenarios {
        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), &scenario.name),
                scenario,
                |b, scenario| {
                    b.iter(|| {
                        let mut sim = Simulator::new(create_gc(strategy));
                        black_box(sim.run(scenario))
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_allocation,
    bench_teardown,
    bench_leak_scan,
    bench_workloads
);
criterion_main!(benches);
