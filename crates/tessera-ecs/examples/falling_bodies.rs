//! Falling bodies demo.
//!
//! Spawns a handful of bodies, removes a component from every other one,
//! recycles a slot, then runs the gravity and physics systems for a few
//! ticks on the worker pool and prints the positions.
//!
//! Run with: `cargo run -p tessera-ecs --example falling_bodies`
//! (set `RUST_LOG=tessera_ecs=trace` to watch entity lifecycle events).

use tessera_ecs::prelude::*;

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

fn print_positions(store: &mut Store<Bodies>) {
    store.run_sequenced::<(&Index, &Position), _>(|(i, p)| {
        println!("Entity {}: ({}, {})", i.0, p.0.x, p.0.y);
    });
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let exec = ParallelExecutor::with_config(ExecutorConfig {
        threads: Some(4),
        ..Default::default()
    })?;
    let mut store = Store::<Bodies>::with_config(StoreConfig {
        initial_capacity: 16,
    });

    let ids: Vec<EntityId> = (0..10)
        .map(|i| {
            store.create((
                Index(i),
                Position(Vec2 {
                    x: i as f64,
                    y: 0.0,
                }),
            ))
        })
        .collect();
    print_positions(&mut store);
    println!("------");

    for id in ids.iter().step_by(2) {
        store.remove_components::<(Position,)>(*id);
    }
    print_positions(&mut store);
    println!("------");

    store.remove(ids[1]);
    let recycled = store.create((Index(1), Position::default()));
    println!("slot of {} reused by {}", ids[1], recycled);

    for id in store.entities().collect::<Vec<_>>() {
        if store.has::<Position>(id) {
            store.add_components(id, (Physics::default(), Gravity));
        }
    }

    for tick in 0..3 {
        store.run_system_with(&GravitySystem, &exec);
        store.run_with::<(&mut Position, &mut Physics), _, _>(
            |(pos, phy)| {
                phy.velocity.x += phy.acceleration.x;
                phy.velocity.y += phy.acceleration.y;
                pos.0.x += phy.velocity.x;
                pos.0.y += phy.velocity.y;
                phy.acceleration = Vec2::default();
            },
            &exec,
        );
        println!("-- tick {tick} --");
        print_positions(&mut store);
    }

    let mut counted = 0;
    store.run_sequenced::<(), _>(|()| counted += 1);
    println!("{counted} entities - {} entities", store.len());
    Ok(())
}
