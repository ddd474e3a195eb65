//! Store throughput benchmarks.
//!
//! Entities each get an `Index`; a seeded Bernoulli(0.25) draw decides
//! whether they also get a `Position`, and an independent draw whether they
//! get `Physics` + `Gravity`. The gravity and physics systems then run over
//! the sparse result, once serially and once on the worker pool.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::distributions::{Bernoulli, Distribution};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use tessera_ecs::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Vec2 {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Position(Vec2);

#[derive(Debug, Clone, Copy, Default)]
struct Physics {
    velocity: Vec2,
    acceleration: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Gravity;

#[derive(Debug, Clone, Copy)]
struct Index(usize);

component_set! {
    struct Bodies {
        index: Index,
        position: Position,
        physics: Physics,
        gravity: Gravity,
    }
}

struct GravitySystem;

impl<'w> System<'w, Bodies> for GravitySystem {
    type Query = (&'w mut Physics, &'w Gravity);

    fn run(&self, (physics, _): Self::Query) {
        physics.acceleration.y -= 9.81;
    }
}

fn integrate((pos, phy): (&mut Position, &mut Physics)) {
    phy.velocity.x += phy.acceleration.x;
    phy.velocity.y += phy.acceleration.y;
    pos.0.x += phy.velocity.x;
    pos.0.y += phy.velocity.y;
    phy.acceleration = Vec2::default();
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn populate(count: usize) -> Store<Bodies> {
    let mut store = Store::with_config(StoreConfig {
        initial_capacity: count,
    });
    let mut rng = Pcg64::seed_from_u64(0x7e55_e7a);
    let dist = Bernoulli::new(0.25).expect("valid probability");

    for i in 0..count {
        let id = store.create((Index(i),));
        if dist.sample(&mut rng) {
            store.add_components(id, (Position::default(),));
        }
        if dist.sample(&mut rng) {
            store.add_components(id, (Physics::default(), Gravity));
        }
    }
    store
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_create(c: &mut Criterion) {
    c.bench_function("create_100k_sparse", |b| {
        b.iter(|| black_box(populate(100_000)));
    });
}

fn bench_gravity(c: &mut Criterion) {
    let exec = ParallelExecutor::new().expect("worker pool");
    let mut group = c.benchmark_group("gravity_update");
    for count in [10_000usize, 100_000, 1_000_000] {
        let mut store = populate(count);
        group.bench_with_input(BenchmarkId::new("serial", count), &count, |b, _| {
            b.iter(|| store.run_system(&GravitySystem));
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            b.iter(|| store.run_system_with(&GravitySystem, &exec));
        });
    }
    group.finish();
}

fn bench_physics(c: &mut Criterion) {
    let exec = ParallelExecutor::new().expect("worker pool");
    let mut group = c.benchmark_group("physics_update");
    for count in [10_000usize, 100_000, 1_000_000] {
        let mut store = populate(count);
        group.bench_with_input(BenchmarkId::new("serial", count), &count, |b, _| {
            b.iter(|| store.run::<(&mut Position, &mut Physics), _>(integrate));
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            b.iter(|| store.run_with::<(&mut Position, &mut Physics), _, _>(integrate, &exec));
        });
    }
    group.finish();
}

fn bench_remove_and_recycle(c: &mut Criterion) {
    c.bench_function("remove_recycle_10k", |b| {
        b.iter_batched(
            || {
                let store = populate(10_000);
                let ids: Vec<EntityId> = store.entities().step_by(2).collect();
                (store, ids)
            },
            |(mut store, ids)| {
                for id in &ids {
                    store.remove(*id);
                }
                for i in 0..ids.len() {
                    store.create((Index(i), Gravity));
                }
                black_box(store.len())
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_create,
    bench_gravity,
    bench_physics,
    bench_remove_and_recycle
);
criterion_main!(benches);
