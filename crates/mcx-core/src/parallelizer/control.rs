use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use mcx_model::{CheckableUnit, Generation, PublishPolicy};

use crate::{
    COORDINATOR_PARALLELIZER,
    channel::CommandPeek,
    error::CoreError,
    guard::{GenerationGuard, GuardSnapshot, GuardState},
    parallelizer::{job, publish::ResultSink},
    pool::WorkerPool,
    verifier::JobContext,
};

/// Outcome of a single start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Start {
    Submitted,
    /// A `StopAll` was waiting in the command slot; nothing was submitted.
    StopObserved,
}

/// State shared between the coordinator loop and its jobs.
pub(crate) struct Shared {
    guard: GenerationGuard,
    peek: CommandPeek,
    pub(super) sink: Arc<dyn ResultSink>,
    pub(super) ctx: JobContext,
    publish: PublishPolicy,
    fatal: CancellationToken,
}

impl Shared {
    pub(super) fn new(
        guard: GenerationGuard,
        peek: CommandPeek,
        sink: Arc<dyn ResultSink>,
        ctx: JobContext,
        publish: PublishPolicy,
    ) -> Self {
        Self {
            guard,
            peek,
            sink,
            ctx,
            publish,
            fatal: CancellationToken::new(),
        }
    }

    pub(super) fn num_parallel(&self) -> usize {
        self.guard.num_parallel()
    }

    pub(super) fn guard(&self) -> &GenerationGuard {
        &self.guard
    }

    pub(super) fn peek(&self) -> &CommandPeek {
        &self.peek
    }

    pub(super) fn publish_policy(&self) -> &PublishPolicy {
        &self.publish
    }

    /// Fires when a job gave up publishing; the loop treats it as fatal.
    pub(super) fn fatal(&self) -> &CancellationToken {
        &self.fatal
    }

    pub(super) async fn snapshot(&self) -> GuardSnapshot {
        self.guard.snapshot().await
    }

    /// Start the first `num_parallel` units, stopping early if a `StopAll` shows up.
    #[instrument(level = "debug", skip(self, units), fields(%generation, units = units.len()))]
    pub(super) async fn start_k(
        self: &Arc<Self>,
        units: Vec<CheckableUnit>,
        generation: Generation,
    ) -> Result<(), CoreError> {
        {
            let state = self.guard.exclusive().await;
            expect_current(&state, generation, "start_k")?;
            if state.running() != 0 {
                return Err(CoreError::ProtocolViolation(format!(
                    "start_k issued with {} job(s) still running in {}",
                    state.running(),
                    state.generation()
                )));
            }
        }

        let k = self.num_parallel().min(units.len());
        if units.len() > k {
            debug!(skipped = units.len() - k, "more units than workers; starting the first {k}");
        }
        for unit in units.into_iter().take(k) {
            if self.start_one(unit, generation).await? == Start::StopObserved {
                debug!("stop pending; remaining units not started");
                break;
            }
        }
        Ok(())
    }

    /// Submit one job.
    #[instrument(level = "debug", skip(self, unit), fields(%generation, invariant = %unit.invariant()))]
    pub(super) async fn start_one(
        self: &Arc<Self>,
        unit: CheckableUnit,
        generation: Generation,
    ) -> Result<Start, CoreError> {
        // Hint only: the generation check in publication is what keeps stale work out.
        if self.peek.stop_pending() {
            debug!("stop pending; job not started");
            return Ok(Start::StopObserved);
        }

        let mut state = self.guard.exclusive().await;
        expect_current(&state, generation, "start_one")?;
        if state.running() >= self.num_parallel() {
            return Err(CoreError::ProtocolViolation(format!(
                "start_one would exceed {} running job(s)",
                self.num_parallel()
            )));
        }

        let shared = Arc::clone(self);
        state
            .pool()
            .submit(move |cancel| job::run(shared, unit, generation, cancel));
        let running = state.admit();
        debug_assert!(running <= self.num_parallel());

        self.ctx.metrics().record_job_started(COORDINATOR_PARALLELIZER);
        debug!(running, "job submitted");
        Ok(Start::Submitted)
    }

    /// Signal every in-flight job, move to `generation` and start over with an empty pool.
    ///
    /// The signal is sent while the guard is held exclusively, so a job reacting to it can
    /// only attempt publication once the generation has advanced.
    #[instrument(level = "debug", skip(self), fields(%generation))]
    pub(super) async fn stop_all(&self, generation: Generation) -> Result<(), CoreError> {
        let mut state = self.guard.exclusive().await;
        let current = state.generation();
        if generation <= current {
            return Err(CoreError::ProtocolViolation(format!(
                "stop_all must advance the generation: got {generation}, current is {current}"
            )));
        }

        info!(from = %current, to = %generation, running = state.running(), "stopping all model checking jobs");
        state.pool().shutdown_now();
        let stale = state.reset(generation, WorkerPool::new(self.num_parallel()));
        drop(state);

        debug!(lingering = stale.in_flight(), "previous pool signalled");
        self.ctx.metrics().record_generation(generation.value());
        Ok(())
    }

    /// Signal the live pool; used when the loop exits.
    pub(super) async fn shutdown_pool(&self) {
        let state = self.guard.exclusive().await;
        state.pool().shutdown_now();
        debug!(lingering = state.pool().in_flight(), "pool signalled on exit");
    }
}

fn expect_current(state: &GuardState, generation: Generation, op: &str) -> Result<(), CoreError> {
    if generation != state.generation() {
        return Err(CoreError::ProtocolViolation(format!(
            "{op} with {generation}, current is {}",
            state.generation()
        )));
    }
    Ok(())
}
