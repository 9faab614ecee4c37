use std::future::{self, Future};

use tokio::sync::mpsc::{UnboundedSender, error::SendError};
use tracing::{debug, error, warn};

use mcx_model::{FailureReason, FailureStage, JobResult};

use crate::{COORDINATOR_PARALLELIZER, error::CoreError, parallelizer::control::Shared};

/// Destination for published results.
///
/// A failed send hands the result back so it can be retried.
pub trait ResultSink: Send + Sync + 'static {
    fn send(&self, result: JobResult) -> Result<(), SendError<JobResult>>;
}

impl ResultSink for UnboundedSender<JobResult> {
    fn send(&self, result: JobResult) -> Result<(), SendError<JobResult>> {
        UnboundedSender::send(self, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    Delivered,
    /// Stale or pre-empted by a pending stop; counts as done.
    Discarded,
}

impl Shared {
    /// One publication attempt under the shared side of the guard.
    ///
    /// Drops the result when a `StopAll` is waiting or its generation is no longer live;
    /// otherwise enqueues it and only then decrements the running count.
    pub(super) async fn write_result(
        &self,
        result: JobResult,
    ) -> Result<Delivery, SendError<JobResult>> {
        let state = self.guard().shared().await;

        if self.peek().stop_pending() || result.generation() != state.generation() {
            debug!(
                result = %result.generation(),
                live = %state.generation(),
                outcome = result.as_label(),
                "discarding stale result"
            );
            self.ctx.metrics().record_result_discarded(COORDINATOR_PARALLELIZER);
            return Ok(Delivery::Discarded);
        }

        let generation = result.generation();
        let outcome = result.as_label();
        self.sink.send(result)?;
        let running = state.retire();
        debug!(%generation, outcome, running, "result published");
        Ok(Delivery::Delivered)
    }

    /// Publish with retries per the configured policy.
    pub(super) async fn publish(&self, result: JobResult) -> Result<Delivery, CoreError> {
        self.retry(result, |result| self.write_result(result)).await
    }

    /// Hand the driver a coordinator failure, bypassing the staleness check.
    ///
    /// Retries like [`Shared::publish`] so a sink that refuses a send only briefly does
    /// not leave the driver waiting.
    pub(super) async fn deliver_fatal(&self, err: &CoreError) {
        let generation = self.guard().shared().await.generation();
        let result = JobResult::Failure {
            reason: FailureReason::new(FailureStage::Coordinator, err.to_string()),
            generation,
        };
        match self
            .retry(result, |result| future::ready(self.sink.send(result)))
            .await
        {
            Ok(()) => debug!(%generation, "coordinator failure delivered"),
            Err(e) => error!(error = %err, cause = %e, "driver unreachable; coordinator failure dropped"),
        }
    }

    /// Run `send` until it accepts `result` or the publish policy runs out.
    async fn retry<T, F, Fut>(&self, mut result: JobResult, mut send: F) -> Result<T, CoreError>
    where
        F: FnMut(JobResult) -> Fut,
        Fut: Future<Output = Result<T, SendError<JobResult>>>,
    {
        let policy = self.publish_policy();
        let mut attempt: u32 = 1;
        loop {
            match send(result).await {
                Ok(done) => return Ok(done),
                Err(SendError(back)) => {
                    if !policy.allows(attempt.saturating_add(1)) {
                        return Err(CoreError::PublishExhausted { attempts: attempt });
                    }
                    let delay = policy.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "failed to enqueue result; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    result = back;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
