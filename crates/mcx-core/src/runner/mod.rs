//! Race-to-first-success batch runner.
//!
//! [`BatchRunner::verify`] checks up to `num_parallel` units at once and keeps the first one
//! that produces an outcome; the rest are cancelled and never observed. There is no generation
//! bookkeeping: every call is independent.
mod error;
pub use error::RunnerError;

mod state;
pub use state::RunnerState;

use std::time::Duration;

use tokio::{task::JoinSet, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use mcx_model::{CheckableUnit, Invariant, VerificationOutcome};

use crate::{
    COORDINATOR_RUNNER,
    error::CoreError,
    metrics::JobOutcome,
    verifier::{CheckError, JobContext},
};

/// Above this many attempted invariants the banner names only the first one.
const BANNER_LIST_LIMIT: usize = 5;

type Attempt = (Invariant, Result<VerificationOutcome, CheckError>);

/// Runs a batch of units against each other; see the module docs.
pub struct BatchRunner {
    num_parallel: usize,
    ctx: JobContext,
    state: RunnerState,
    invariants_ran: Vec<Invariant>,
    winner: Option<(Invariant, VerificationOutcome)>,
    log_info: Option<String>,
}

impl BatchRunner {
    pub fn new(num_parallel: usize, ctx: JobContext) -> Result<Self, CoreError> {
        if num_parallel == 0 {
            return Err(CoreError::Config("numParallel must be at least 1".into()));
        }
        Ok(Self {
            num_parallel,
            ctx,
            state: RunnerState::Idle,
            invariants_ran: Vec::new(),
            winner: None,
            log_info: None,
        })
    }

    pub fn num_parallel(&self) -> usize {
        self.num_parallel
    }

    /// Note appended to the banner of the next [`BatchRunner::verify`] call only.
    pub fn log_info(&mut self, text: impl Into<String>) {
        self.log_info = Some(text.into());
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Invariant of the unit that won the last call.
    pub fn result_invariant(&self) -> Option<&Invariant> {
        self.winner.as_ref().map(|(inv, _)| inv)
    }

    /// Outcome of the unit that won the last call.
    pub fn mc_result(&self) -> Option<&VerificationOutcome> {
        self.winner.as_ref().map(|(_, outcome)| outcome)
    }

    /// Invariants attempted by the last call, in submission order. Kept on failure too.
    pub fn invariants_ran(&self) -> &[Invariant] {
        &self.invariants_ran
    }

    /// Check the first `num_parallel` units and return once one of them succeeds.
    ///
    /// Fails with [`RunnerError::Timeout`] when `batch_timeout` elapses first and with
    /// [`RunnerError::Failed`] when every unit ends without an outcome.
    #[instrument(
        level = "info",
        name = "runner",
        skip_all,
        fields(num_parallel = self.num_parallel, batch_timeout_secs = batch_timeout.as_secs())
    )]
    pub async fn verify(
        &mut self,
        units: &[CheckableUnit],
        batch_timeout: Duration,
    ) -> Result<(), RunnerError> {
        self.state = RunnerState::Idle;
        self.winner = None;

        let selected = &units[..units.len().min(self.num_parallel)];
        self.invariants_ran = selected.iter().map(|u| u.invariant().clone()).collect();
        if selected.is_empty() {
            self.state = RunnerState::Failed;
            return Err(RunnerError::NoUnits);
        }

        info!("{}", banner(&self.invariants_ran, self.log_info.take().as_deref()));

        let cancel = CancellationToken::new();
        // Dropping this call mid-race stops the jobs as well.
        let _stop = cancel.clone().drop_guard();
        let mut jobs = JoinSet::new();
        for unit in selected {
            jobs.spawn(attempt(self.ctx.clone(), unit.clone(), cancel.child_token()));
        }
        self.state = RunnerState::Submitted;
        debug!(submitted = selected.len(), skipped = units.len() - selected.len(), "race started");

        let raced = tokio::time::timeout(batch_timeout, first_success(&mut jobs)).await;
        cancel.cancel();
        jobs.abort_all();

        match raced {
            Ok(Ok((invariant, outcome))) => {
                info!(%invariant, verdict = ?outcome.verdict, elapsed_ms = outcome.elapsed_ms, "race won");
                self.winner = Some((invariant, outcome));
                self.state = RunnerState::Completed;
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "no unit produced an outcome");
                self.state = RunnerState::Failed;
                Err(err)
            }
            Err(_) => {
                warn!(attempted = self.invariants_ran.len(), "batch timed out");
                self.state = RunnerState::TimedOut;
                Err(RunnerError::Timeout(batch_timeout))
            }
        }
    }
}

async fn attempt(ctx: JobContext, unit: CheckableUnit, cancel: CancellationToken) -> Attempt {
    let metrics = ctx.metrics().clone();
    metrics.record_job_started(COORDINATOR_RUNNER);

    let started = Instant::now();
    let res = ctx.check_isolated(unit.clone(), unit.timeout(), cancel).await;

    let outcome = match &res {
        Ok(_) => JobOutcome::Success,
        Err(e) => JobOutcome::from(e),
    };
    metrics.record_job_completed(
        COORDINATOR_RUNNER,
        outcome,
        started.elapsed().as_millis() as u64,
    );
    (unit.invariant().clone(), res)
}

/// Drain `jobs` until one succeeds; remembers the last failure otherwise.
async fn first_success(
    jobs: &mut JoinSet<Attempt>,
) -> Result<(Invariant, VerificationOutcome), RunnerError> {
    let mut last_err = None;
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok((invariant, Ok(outcome))) => return Ok((invariant, outcome)),
            Ok((invariant, Err(e))) => {
                debug!(%invariant, error = %e, "attempt failed");
                last_err = Some(format!("{invariant}: {e}"));
            }
            Err(e) => last_err = Some(e.to_string()),
        }
    }
    Err(RunnerError::Failed(
        last_err.unwrap_or_else(|| "no attempt finished".to_string()),
    ))
}

fn banner(invariants: &[Invariant], note: Option<&str>) -> String {
    let listed = match invariants {
        [first, rest @ ..] if invariants.len() > BANNER_LIST_LIMIT => {
            format!("{first} and {} others", rest.len())
        }
        _ => {
            let names: Vec<_> = invariants.iter().map(ToString::to_string).collect();
            format!("[{}]", names.join(", "))
        }
    };
    match note {
        Some(note) => format!("Checking ... {listed}. {note}"),
        None => format!("Checking ... {listed}."),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use async_trait::async_trait;
    use mcx_model::Verdict;

    use super::*;
    use crate::verifier::{PreparedInput, TemplateBuilder, Verifier, VerifyError};

    /// Succeeds after the configured delay; fails for unknown or `None` entries.
    struct Delayed(HashMap<String, Option<Duration>>);

    #[async_trait]
    impl Verifier for Delayed {
        fn name(&self) -> &'static str {
            "delayed"
        }

        async fn verify(
            &self,
            input: &PreparedInput,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<VerificationOutcome, VerifyError> {
            match self.0.get(input.text()).copied().flatten() {
                Some(after) => {
                    tokio::time::sleep(after).await;
                    Ok(VerificationOutcome::new(Verdict::Safe, input.text(), 0))
                }
                None => Err(VerifyError::Failed(format!("{} rejected", input.text()))),
            }
        }
    }

    fn inv(name: &str) -> Invariant {
        format!("{name} AFby done").parse().unwrap()
    }

    fn unit(name: &str) -> CheckableUnit {
        CheckableUnit::new("{{invariant}}", inv(name), Duration::from_secs(60))
    }

    fn runner(n: usize, plan: &[(&str, Option<u64>)]) -> BatchRunner {
        let delays = plan
            .iter()
            .map(|(name, secs)| (inv(name).to_string(), secs.map(Duration::from_secs)))
            .collect();
        let ctx = JobContext::new(Arc::new(Delayed(delays)), Arc::new(TemplateBuilder::new()));
        BatchRunner::new(n, ctx).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_wins_and_others_are_abandoned() {
        let mut r = runner(3, &[("u1", Some(5)), ("u2", Some(1)), ("u3", Some(5))]);
        let start = Instant::now();

        r.verify(&[unit("u1"), unit("u2"), unit("u3")], Duration::from_secs(10))
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
        assert_eq!(r.result_invariant(), Some(&inv("u2")));
        assert!(r.mc_result().unwrap().is_safe());
        assert_eq!(r.invariants_ran(), &[inv("u1"), inv("u2"), inv("u3")]);
        assert_eq!(r.state(), RunnerState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_timeout_is_surfaced() {
        let mut r = runner(3, &[("u1", Some(20)), ("u2", Some(20)), ("u3", Some(20))]);
        let start = Instant::now();

        let err = r
            .verify(&[unit("u1"), unit("u2"), unit("u3")], Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::Timeout(d) if d == Duration::from_secs(5)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        assert_eq!(r.state(), RunnerState::TimedOut);
        assert!(r.result_invariant().is_none());
        assert!(r.mc_result().is_none());
        assert_eq!(r.invariants_ran().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_win() {
        let mut r = runner(2, &[("bad", None), ("good", Some(3))]);
        r.verify(&[unit("bad"), unit("good")], Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(r.result_invariant(), Some(&inv("good")));
    }

    #[tokio::test(start_paused = true)]
    async fn all_failures_are_reported() {
        let mut r = runner(2, &[("a", None), ("b", None)]);
        let err = r
            .verify(&[unit("a"), unit("b")], Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Failed(ref msg) if msg.contains("rejected")));
        assert_eq!(r.state(), RunnerState::Failed);
        assert_eq!(r.invariants_ran().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn takes_a_prefix_of_num_parallel_units() {
        let mut r = runner(2, &[("u1", Some(2)), ("u2", Some(2)), ("u3", Some(1))]);
        r.verify(&[unit("u1"), unit("u2"), unit("u3")], Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(r.invariants_ran(), &[inv("u1"), inv("u2")]);
        assert_ne!(r.result_invariant(), Some(&inv("u3")));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let mut r = runner(2, &[]);
        let err = r.verify(&[], Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RunnerError::NoUnits));
        assert!(r.invariants_ran().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_starts_fresh() {
        let mut r = runner(1, &[("slow", Some(20)), ("fast", Some(1))]);
        r.verify(&[unit("fast")], Duration::from_secs(5)).await.unwrap();
        assert!(r.result_invariant().is_some());

        r.verify(&[unit("slow")], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(r.result_invariant().is_none());
        assert_eq!(r.invariants_ran(), &[inv("slow")]);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let ctx = JobContext::new(
            Arc::new(Delayed(HashMap::new())),
            Arc::new(TemplateBuilder::new()),
        );
        assert!(BatchRunner::new(0, ctx).is_err());
    }

    #[test]
    fn banner_lists_few_invariants() {
        let invs = [inv("a"), inv("b")];
        assert_eq!(
            banner(&invs, None),
            "Checking ... [a AFby done, b AFby done]."
        );
        assert_eq!(
            banner(&invs, Some("refinement 3")),
            "Checking ... [a AFby done, b AFby done]. refinement 3"
        );
    }

    #[test]
    fn banner_summarises_many_invariants() {
        let invs: Vec<_> = (0..7).map(|i| inv(&format!("e{i}"))).collect();
        assert_eq!(banner(&invs, None), "Checking ... e0 AFby done and 6 others.");
    }

    #[tokio::test]
    async fn log_info_is_one_shot() {
        let mut r = runner(1, &[("a", Some(0))]);
        r.log_info("first pass");
        r.verify(&[unit("a")], Duration::from_secs(1)).await.unwrap();
        assert!(r.log_info.is_none());
    }
}
