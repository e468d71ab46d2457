// Rayon thread pool configuration for the parallel trial path.

use rayon::ThreadPoolBuilder;

use super::SimulationError;

/// How many worker threads run Monte Carlo trials.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. 0 uses the global Rayon pool.
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Run `f` on a pool of this size. A non-zero worker count builds a
    /// temporary pool for the duration of the call.
    pub fn install<F, R>(&self, f: F) -> Result<R, SimulationError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return Ok(f());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("fplsquad-trial-{i}"))
            .build()
            .map_err(|e| SimulationError::WorkerPool(e.to_string()))?;
        Ok(pool.install(f))
    }
}
