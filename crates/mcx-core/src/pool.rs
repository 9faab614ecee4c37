use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Fixed-capacity executor for job bodies.
///
/// At most `size` jobs run at once; extra submissions queue for a permit.
/// [`WorkerPool::shutdown_now`] only signals: jobs that ignore their token keep running
/// until they finish on their own.
pub(crate) struct WorkerPool {
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl WorkerPool {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run `job` on the pool. The job receives a token that fires on shutdown.
    pub(crate) fn submit<F, Fut>(&self, job: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.child_token();

        self.tracker.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                permit = permits.acquire_owned() => permit,
            };
            let Ok(_permit) = permit else {
                return;
            };
            job(cancel).await;
        });
    }

    /// Signal every job to stop and refuse to track new ones.
    pub(crate) fn shutdown_now(&self) {
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Jobs spawned on this pool that have not finished yet.
    pub(crate) fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    #[cfg(test)]
    pub(crate) async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn never_runs_more_than_size_jobs() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            pool.submit(move |_cancel| async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.wait().await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_signals_running_and_queued_jobs() {
        let pool = WorkerPool::new(1);
        let interrupted = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let interrupted = Arc::clone(&interrupted);
            let ran = Arc::clone(&ran);
            pool.submit(move |cancel| async move {
                ran.fetch_add(1, Ordering::SeqCst);
                cancel.cancelled().await;
                interrupted.fetch_add(1, Ordering::SeqCst);
            });
        }
        while ran.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(pool.in_flight(), 3);

        pool.shutdown_now();
        pool.wait().await;

        // Only the job holding the single permit ever started.
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(interrupted.load(Ordering::SeqCst), 1);
        assert_eq!(pool.in_flight(), 0);
    }
}
