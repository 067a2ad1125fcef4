use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::EpssError;

/// Runs per-date work either on the calling thread or on a bounded pool.
pub enum Executor {
    /// Sequential, in input order. Deterministic; used by tests.
    Inline,
    Pool(ThreadPool),
}

impl Executor {
    pub fn inline() -> Self {
        Executor::Inline
    }

    /// Pool with `workers` threads; 0 means one per core.
    pub fn with_workers(workers: usize) -> crate::Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("epss-download-{}", i))
            .build()
            .map_err(|e| EpssError::Executor(e.to_string()))?;
        Ok(Executor::Pool(pool))
    }

    pub fn workers(&self) -> usize {
        match self {
            Executor::Inline => 1,
            Executor::Pool(pool) => pool.current_num_threads(),
        }
    }

    /// Apply `f` to every item and wait for all of them. Results keep input order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            Executor::Inline => items.iter().map(f).collect(),
            Executor::Pool(pool) => pool.install(|| items.par_iter().map(f).collect()),
        }
    }

    /// Releases the pool threads. `map` blocks until its work is done, so
    /// nothing is in flight once it has returned.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Executor::Inline => f.write_str("Executor::Inline"),
            Executor::Pool(pool) => write!(f, "Executor::Pool({})", pool.current_num_threads()),
        }
    }
}
