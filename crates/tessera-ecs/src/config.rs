//! Host-facing configuration for stores and executors.
//!
//! Both structs are plain data with public fields. Missing fields take their
//! defaults when deserialized, so a host can load a partial JSON/TOML table.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of entity slots to make room for up front.
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    /// No slots reserved.
    fn default() -> Self {
        Self {
            initial_capacity: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutorConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`ParallelExecutor`](crate::executor::ParallelExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker count. `None` uses the hardware concurrency; `0` is treated as 1.
    pub threads: Option<usize>,
    /// Prefix for worker thread names (`{thread_name}-{i}`).
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    /// Hardware concurrency, threads named `tessera-worker-{i}`.
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: "tessera-worker".to_owned(),
        }
    }
}

impl ExecutorConfig {
    /// The worker count this config resolves to. Never zero.
    pub fn resolved_threads(&self) -> usize {
        self.threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}
