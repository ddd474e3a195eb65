//! Iteration strategies over an index range `[0, len)`.
//!
//! [`SerialExecutor`] walks the range in order on the calling thread.
//! [`ParallelExecutor`] owns a reusable rayon pool; every worker repeatedly
//! claims the next unclaimed index from a shared atomic cursor, so each index
//! is handed out exactly once with no ordering guarantee.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ExecutorConfig;
use crate::ExecutorError;

/// Runs `f(i)` for every `i` in `[0, len)` and returns once all calls are
/// done.
///
/// [`Store::run_with`](crate::store::Store::run_with) hands out `&mut`
/// component references per index, so a custom executor has to be declared
/// with `unsafe impl`:
///
/// ```
/// use tessera_ecs::executor::Executor;
///
/// struct Backwards;
///
/// // SAFETY: each index in `[0, len)` is passed to `f` exactly once.
/// unsafe impl Executor for Backwards {
///     fn run<F: Fn(usize) + Sync>(&self, len: usize, f: F) {
///         (0..len).rev().for_each(f);
///     }
/// }
/// ```
///
/// A safe impl is rejected:
///
/// ```compile_fail,E0200
/// use tessera_ecs::executor::Executor;
///
/// struct Twice;
///
/// impl Executor for Twice {
///     fn run<F: Fn(usize) + Sync>(&self, len: usize, f: F) {
///         (0..len).for_each(&f);
///         f(0);
///     }
/// }
/// ```
///
/// # Safety
///
/// `run` must pass each index in `[0, len)` to `f` at most once, and must not
/// return before every call it started has finished.
pub unsafe trait Executor {
    /// Call `f` for every index in `[0, len)`.
    fn run<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync;
}

// ---------------------------------------------------------------------------
// SerialExecutor
// ---------------------------------------------------------------------------

/// In-order execution on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

// SAFETY: a plain ascending loop visits each index once.
unsafe impl Executor for SerialExecutor {
    #[inline]
    fn run<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        for i in 0..len {
            f(i);
        }
    }
}

// ---------------------------------------------------------------------------
// ParallelExecutor
// ---------------------------------------------------------------------------

/// Work-sharing execution on a dedicated worker pool.
///
/// The pool is built once and reused by every [`run`](Executor::run). A panic
/// inside `f` is re-raised on the caller after the workers have joined.
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl ParallelExecutor {
    /// One worker per hardware thread.
    pub fn new() -> Result<Self, ExecutorError> {
        Self::with_config(ExecutorConfig::default())
    }

    /// Exactly `threads` workers (at least one).
    pub fn with_threads(threads: usize) -> Result<Self, ExecutorError> {
        Self::with_config(ExecutorConfig {
            threads: Some(threads),
            ..Default::default()
        })
    }

    /// Pool sized and named from `config`.
    pub fn with_config(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let threads = config.resolved_threads();
        let prefix = config.thread_name;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        tracing::debug!(threads, "built parallel executor pool");
        Ok(Self { pool, threads })
    }

    /// Number of workers in the pool.
    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}

// SAFETY: indices come from one atomic cursor, so each is claimed once, and
// the scope joins every worker before `run` returns.
unsafe impl Executor for ParallelExecutor {
    fn run<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        if len == 0 {
            return;
        }
        let cursor = AtomicUsize::new(0);
        let workers = self.threads.min(len);
        let (cursor, f) = (&cursor, &f);
        self.pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(move |_| loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    if i >= len {
                        break;
                    }
                    f(i);
                });
            }
        });
    }
}
