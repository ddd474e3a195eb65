//! Tessera ECS -- sparse-set Entity Component System with type bitmasks.
//!
//! Every component type of a store is declared up front with
//! [`component_set!`]. Each type gets its own sparse-set column and one bit in
//! a 64-bit [`TypeMask`]; every entity slot carries a mask telling which
//! columns hold a value for it, plus an *alive* bit. Systems run over every
//! slot whose mask contains the bits they ask for, serially or on a worker
//! pool. Removed slots are recycled in FIFO order behind generational ids.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! component_set! {
//!     struct World2d {
//!         position: Position,
//!         velocity: Velocity,
//!     }
//! }
//!
//! let mut store = Store::<World2d>::new();
//! let e = store.create((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//!
//! store.run::<(&mut Position, &Velocity), _>(|(p, v)| {
//!     p.x += v.dx;
//!     p.y += v.dy;
//! });
//!
//! assert_eq!(store.get::<Position>(e), Some(&Position { x: 1.0, y: 0.0 }));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod config;
pub mod entity;
#[allow(unsafe_code)]
pub mod executor;
pub mod mask;
#[allow(unsafe_code)]
pub mod query;
#[allow(unsafe_code)]
pub mod sparse_set;
pub mod store;

pub use component::{Bundle, Component, ComponentSet, Signature};
pub use mask::TypeMask;
pub use sparse_set::SparseSet;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (removed, or its slot was recycled).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },
}

/// Errors produced while setting up an executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Bundle, Component, ComponentSet, Signature};
    pub use crate::component_set;
    pub use crate::config::{ExecutorConfig, StoreConfig};
    pub use crate::entity::EntityId;
    pub use crate::executor::{Executor, ParallelExecutor, SerialExecutor};
    pub use crate::mask::TypeMask;
    pub use crate::query::{Query, System};
    pub use crate::store::Store;
    pub use crate::{EcsError, ExecutorError};
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
