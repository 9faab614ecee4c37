use anyhow::{Context, anyhow, bail};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mcx_core::{CoreError, JobContext, Parallelizer, ParallelizerConfig};
use mcx_model::{CheckableUnit, Command, FailureStage, Generation, JobResult, Verdict};

/// Per-outcome counts of a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub safe: usize,
    pub unsafe_: usize,
    pub unknown: usize,
    pub timeouts: usize,
    pub interrupted: usize,
    pub failures: usize,
}

impl Tally {
    fn record(&mut self, result: &JobResult) {
        match result {
            JobResult::Success { outcome, .. } => match outcome.verdict {
                Verdict::Safe => self.safe += 1,
                Verdict::Unsafe => self.unsafe_ += 1,
                Verdict::Unknown => self.unknown += 1,
            },
            JobResult::Timeout { .. } => self.timeouts += 1,
            JobResult::Interrupted { .. } => self.interrupted += 1,
            JobResult::Failure { .. } => self.failures += 1,
        }
    }
}

/// Check every unit: `StartK` fills the pool, then one `StartOne` per result until
/// the units run out. Everything runs in the initial generation.
pub async fn run(
    cfg: ParallelizerConfig,
    ctx: JobContext,
    units: Vec<CheckableUnit>,
    shutdown: CancellationToken,
) -> anyhow::Result<Tally> {
    let num_parallel = cfg.num_parallel;
    let (parallelizer, mut driver) = Parallelizer::new(cfg, ctx)?;
    let handle = parallelizer.spawn(shutdown);
    let generation = Generation::INITIAL;

    let mut pending = units.into_iter();
    let first: Vec<_> = pending.by_ref().take(num_parallel).collect();
    let mut outstanding = first.len();
    info!(first = outstanding, remaining = pending.len(), "starting pipeline");
    if driver
        .send(Command::StartK {
            units: first,
            generation,
        })
        .await
        .is_err()
    {
        return Err(stopped(handle).await);
    }

    let mut tally = Tally::default();
    while outstanding > 0 {
        let Some(result) = driver.recv().await else {
            bail!("parallelizer closed the result channel");
        };

        if let JobResult::Failure { reason, .. } = &result {
            if reason.stage == FailureStage::Coordinator {
                return Err(stopped(handle).await.context(reason.to_string()));
            }
        }

        outstanding -= 1;
        log_result(&result);
        tally.record(&result);

        if let Some(unit) = pending.next() {
            if driver
                .send(Command::StartOne { unit, generation })
                .await
                .is_err()
            {
                return Err(stopped(handle).await);
            }
            outstanding += 1;
        }
    }

    // Closing the command side lets the loop exit cleanly.
    drop(driver);
    handle.await.context("parallelizer task")??;
    Ok(tally)
}

/// Why the parallelizer task ended early.
async fn stopped(handle: JoinHandle<Result<(), CoreError>>) -> anyhow::Error {
    match handle.await {
        Ok(Err(e)) => e.into(),
        Ok(Ok(())) => anyhow!("parallelizer stopped unexpectedly"),
        Err(e) => anyhow::Error::new(e).context("parallelizer task"),
    }
}

fn log_result(result: &JobResult) {
    let invariant = result
        .invariant()
        .map(ToString::to_string)
        .unwrap_or_default();
    match result {
        JobResult::Success { outcome, .. } => info!(
            %invariant,
            verdict = ?outcome.verdict,
            elapsed_ms = outcome.elapsed_ms,
            "invariant checked"
        ),
        JobResult::Timeout { unit, .. } => warn!(
            %invariant,
            timeout_secs = unit.timeout().as_secs(),
            "check timed out"
        ),
        JobResult::Interrupted { .. } => warn!(%invariant, "check interrupted"),
        JobResult::Failure { reason, .. } => warn!(%reason, "check failed"),
    }
}
