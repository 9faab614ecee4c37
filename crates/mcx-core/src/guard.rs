use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::error;

use mcx_model::Generation;

use crate::pool::WorkerPool;

/// State arbitrated by the [`GenerationGuard`].
///
/// `generation` and `pool` only change under the exclusive side. `running` grows under
/// the exclusive side and shrinks under the shared side, hence the atomic.
pub(crate) struct GuardState {
    generation: Generation,
    running: AtomicUsize,
    pool: WorkerPool,
}

impl GuardState {
    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Count a freshly submitted job. Exclusive side only.
    pub(crate) fn admit(&mut self) -> usize {
        let running = self.running.get_mut();
        *running += 1;
        *running
    }

    /// Count a published result. Shared side; never goes below zero.
    pub(crate) fn retire(&self) -> usize {
        match self
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(prev) => prev - 1,
            Err(_) => {
                error!(generation = %self.generation, "result published with no job running");
                debug_assert!(false, "running count would go negative");
                0
            }
        }
    }

    /// Move to `generation` with a fresh pool and zero running jobs. Exclusive side only.
    ///
    /// Returns the previous pool, already signalled by the caller or not.
    pub(crate) fn reset(&mut self, generation: Generation, pool: WorkerPool) -> WorkerPool {
        self.generation = generation;
        *self.running.get_mut() = 0;
        std::mem::replace(&mut self.pool, pool)
    }
}

/// Reader/writer arbitration between pool mutation and result publication.
///
/// Start/stop take the exclusive side; publications take the shared side and may
/// overlap with each other but never with a start or a stop.
pub(crate) struct GenerationGuard {
    state: RwLock<GuardState>,
    num_parallel: usize,
}

impl GenerationGuard {
    pub(crate) fn new(num_parallel: usize) -> Self {
        Self {
            state: RwLock::new(GuardState {
                generation: Generation::INITIAL,
                running: AtomicUsize::new(0),
                pool: WorkerPool::new(num_parallel),
            }),
            num_parallel,
        }
    }

    pub(crate) fn num_parallel(&self) -> usize {
        self.num_parallel
    }

    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, GuardState> {
        self.state.write().await
    }

    pub(crate) async fn shared(&self) -> RwLockReadGuard<'_, GuardState> {
        self.state.read().await
    }

    pub(crate) async fn snapshot(&self) -> GuardSnapshot {
        let state = self.shared().await;
        GuardSnapshot {
            generation: state.generation(),
            running: state.running(),
            num_parallel: self.num_parallel,
        }
    }
}

/// Point-in-time view of the parallelizer bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardSnapshot {
    pub generation: Generation,
    pub running: usize,
    pub num_parallel: usize,
}
