//! # Pool Benchmark
//!
//! Churn through the slot pool and the ID pool the way a busy battle does:
//! wreckage appears and disappears every tick.
//!
//! Run with: `cargo bench --package tellus_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tellus_core::{IdPool, SlotPool};

/// Stand-in for a feature-sized object.
#[derive(Clone, Copy)]
struct Payload {
    pos: [f32; 3],
    speed: [f32; 3],
    health: f32,
    team: i32,
}

const PAYLOAD: Payload = Payload {
    pos: [0.0; 3],
    speed: [0.0; 3],
    health: 100.0,
    team: 0,
};

/// Benchmark: allocate then release a batch of objects, reusing pages.
fn bench_slot_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_churn");

    for count in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut pool: SlotPool<Payload> = SlotPool::new();
            let mut handles = Vec::with_capacity(count);

            b.iter(|| {
                for _ in 0..count {
                    handles.push(pool.allocate(PAYLOAD).unwrap());
                }
                for handle in handles.drain(..) {
                    black_box(pool.release(handle));
                }
                pool.page_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: acquire/release IDs across tick boundaries.
fn bench_id_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("id_churn");

    for count in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut ids = IdPool::new(32_000, 1);
            let mut live = Vec::with_capacity(count);
            let mut tick = 0;

            b.iter(|| {
                tick += 1;
                ids.begin_tick(tick);
                for _ in 0..count {
                    live.push(ids.acquire().unwrap());
                }
                for id in live.drain(..) {
                    ids.release(id).unwrap();
                }
                black_box(ids.deferred_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: object access through handles.
fn bench_slot_access(c: &mut Criterion) {
    let mut pool: SlotPool<Payload> = SlotPool::new();
    let handles: Vec<_> = (0..10_000)
        .map(|_| pool.allocate(PAYLOAD).unwrap())
        .collect();

    c.bench_function("slot_access_10k", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for &handle in &handles {
                if let Some(p) = pool.get(handle) {
                    total += p.health + p.pos[1] + p.speed[1];
                    black_box(p.team);
                }
            }
            total
        });
    });
}

criterion_group!(benches, bench_slot_churn, bench_id_churn, bench_slot_access);
criterion_main!(benches);
