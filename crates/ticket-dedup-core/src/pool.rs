//! Bounded worker pool for independent per-file work.
//!
//! Each call builds a dedicated rayon pool sized to the configured job
//! count, so `--jobs` is honored regardless of the global pool.

use std::num::NonZeroUsize;
use std::thread;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::DedupError;

/// Worker count used when none is configured: one per available core.
#[must_use]
pub fn default_jobs() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Build a pool with exactly `jobs` threads (`0` is treated as 1).
///
/// # Errors
///
/// Returns [`DedupError::Pool`] if the threads cannot be spawned.
pub fn build(jobs: usize) -> Result<ThreadPool, DedupError> {
    ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|index| format!("ticket-dedup-{index}"))
        .build()
        .map_err(|err| DedupError::Pool(err.to_string()))
}

/// Apply `f` to every item on at most `jobs` threads, preserving input order.
///
/// # Errors
///
/// Returns [`DedupError::Pool`] if the pool cannot be built.
pub fn map_ordered<T, R, F>(items: &[T], jobs: usize, f: F) -> Result<Vec<R>, DedupError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let pool = build(jobs.min(items.len()))?;
    Ok(pool.install(|| items.par_iter().map(f).collect()))
}
