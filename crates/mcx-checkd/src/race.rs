use std::time::Duration;

use tracing::info;

use mcx_core::{BatchRunner, JobContext};
use mcx_model::{CheckableUnit, Invariant, VerificationOutcome};

/// Winner of a race plus everything that was attempted.
#[derive(Debug)]
pub struct RaceReport {
    pub winner: Invariant,
    pub outcome: VerificationOutcome,
    pub attempted: Vec<Invariant>,
}

/// Race the first `num_parallel` units; the first success wins.
pub async fn run(
    num_parallel: usize,
    ctx: JobContext,
    units: &[CheckableUnit],
    batch_timeout: Duration,
) -> anyhow::Result<RaceReport> {
    let mut runner = BatchRunner::new(num_parallel, ctx)?;
    runner.log_info(format!("({} configured)", units.len()));

    let res = runner.verify(units, batch_timeout).await;
    let attempted = runner.invariants_ran().to_vec();
    info!(
        state = %runner.state(),
        attempted = ?attempted.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "race finished"
    );
    res?;

    match (runner.result_invariant(), runner.mc_result()) {
        (Some(winner), Some(outcome)) => Ok(RaceReport {
            winner: winner.clone(),
            outcome: outcome.clone(),
            attempted,
        }),
        _ => anyhow::bail!("race completed without a winner"),
    }
}
