//! Row-sharded stage execution on a shared worker pool.
//!
//! Each stage hands the scheduler the buffer(s) it writes. The buffers are
//! split into stride-sized chunks, border rows are skipped, and one task per
//! map row runs on the pool. A stage call returns only once every row task
//! has finished, which is the barrier between stages.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::{EngineError, GridGeometry, MapRow, Stage};

/// Worker threads shared by every engine of a simulation.
///
/// Cloning is cheap and shares the same threads. An inline pool runs row
/// tasks serially on the calling thread.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl WorkerPool {
    /// Build a pool with `threads` workers (0 = available parallelism).
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        let threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("flowgrid-worker-{}", i))
            .build()?;
        log::debug!("Created worker pool with {} threads", threads);
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Pool that executes row tasks on the calling thread.
    pub fn inline() -> Self {
        Self { pool: None }
    }

    /// Whether row tasks run on the calling thread.
    pub fn is_inline(&self) -> bool {
        self.pool.is_none()
    }

    /// Number of threads row tasks run on.
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, |pool| pool.current_num_threads())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("inline", &self.is_inline())
            .field("threads", &self.threads())
            .finish()
    }
}

/// Dispatches one task per map row for a stage and waits for all of them.
#[derive(Debug, Clone)]
pub struct RowScheduler {
    pool: WorkerPool,
    geometry: GridGeometry,
}

impl RowScheduler {
    pub fn new(geometry: GridGeometry, pool: WorkerPool) -> Self {
        Self { pool, geometry }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn set_pool(&mut self, pool: WorkerPool) {
        self.pool = pool;
    }

    /// Run `task` for every map row of `out`, each task owning its row chunk.
    ///
    /// The first error returned by a task is returned once the stage has
    /// stopped; a panicking task propagates its panic to the caller.
    pub fn run<T, F>(&self, stage: Stage, out: &mut [T], task: F) -> Result<(), EngineError>
    where
        T: Send,
        F: Fn(MapRow, &mut [T]) -> Result<(), EngineError> + Sync + Send,
    {
        let geometry = self.geometry;
        geometry.check_buffer("stage output", out.len())?;
        let (first, rows, stride) = (geometry.first_row(), geometry.height(), geometry.stride());
        let started = Instant::now();

        let result = match &self.pool.pool {
            None => out
                .chunks_mut(stride)
                .enumerate()
                .skip(first)
                .take(rows)
                .try_for_each(|(chunk, row)| task(geometry.row(chunk), row)),
            Some(pool) => pool.install(|| {
                out.par_chunks_mut(stride)
                    .enumerate()
                    .skip(first)
                    .take(rows)
                    .try_for_each(|(chunk, row)| task(geometry.row(chunk), row))
            }),
        };

        log::trace!("{} stage finished in {:?}", stage, started.elapsed());
        result
    }

    /// Like [`RowScheduler::run`] for stages that write two buffers.
    pub fn run_pair<A, B, F>(
        &self,
        stage: Stage,
        first_out: &mut [A],
        second_out: &mut [B],
        task: F,
    ) -> Result<(), EngineError>
    where
        A: Send,
        B: Send,
        F: Fn(MapRow, &mut [A], &mut [B]) -> Result<(), EngineError> + Sync + Send,
    {
        let geometry = self.geometry;
        geometry.check_buffer("stage output", first_out.len())?;
        geometry.check_buffer("stage output", second_out.len())?;
        let (first, rows, stride) = (geometry.first_row(), geometry.height(), geometry.stride());
        let started = Instant::now();

        let result = match &self.pool.pool {
            None => first_out
                .chunks_mut(stride)
                .zip(second_out.chunks_mut(stride))
                .enumerate()
                .skip(first)
                .take(rows)
                .try_for_each(|(chunk, (a, b))| task(geometry.row(chunk), a, b)),
            Some(pool) => pool.install(|| {
                first_out
                    .par_chunks_mut(stride)
                    .zip(second_out.par_chunks_mut(stride))
                    .enumerate()
                    .skip(first)
                    .take(rows)
                    .try_for_each(|(chunk, (a, b))| task(geometry.row(chunk), a, b))
            }),
        };

        log::trace!("{} stage finished in {:?}", stage, started.elapsed());
        result
    }
}
