//! Statically partitioned thread pool and cooperative shutdown
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

/// A fixed-size pool that distributes indices by `index % thread_count`. Task `t` processes the indices
/// `t, t + T, t + 2T, ...`, so every index is handled by exactly one task and the work assignment does not depend
/// on timing. Suited for loops whose iterations all cost roughly the same.
pub struct StridedPool {
    pool: rayon::ThreadPool,
    thread_count: usize,
}

impl StridedPool {
    /// Creates a pool with exactly `thread_count` worker threads
    ///
    /// # Panics
    ///
    /// If `thread_count` is zero
    pub fn new(thread_count: usize) -> Result<Self> {
        if thread_count == 0 {
            panic!("StridedPool::new: thread_count must be at least 1");
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .with_context(|| format!("Could not create a pool with {} threads", thread_count))?;
        Ok(Self { pool, thread_count })
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Evaluates `f` for every index in `0..len` and returns the results in index order
    /// ```
    /// # use facet_core::parallel::StridedPool;
    /// let pool = StridedPool::new(3).unwrap();
    /// assert_eq!(pool.map(5, |i| i * i), vec![0, 1, 4, 9, 16]);
    /// ```
    pub fn map<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let threads = self.thread_count;
        let partitions: Vec<Vec<T>> = self.pool.install(|| {
            (0..threads)
                .into_par_iter()
                .map(|task| (task..len).step_by(threads).map(&f).collect())
                .collect()
        });

        let mut partitions: Vec<_> = partitions.into_iter().map(Vec::into_iter).collect();
        (0..len)
            .filter_map(|index| partitions[index % threads].next())
            .collect()
    }
}

/// Flag polled by long running engines between their outer iterations. Raising it makes the engine stop at the
/// next check with an error. A threaded stage that already started is not interrupted
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns an error naming `stage` if shutdown was requested
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_requested() {
            bail!("Shutdown requested during {}", stage);
        }
        Ok(())
    }
}
