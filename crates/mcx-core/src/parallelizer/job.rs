use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use mcx_model::{CheckableUnit, FailureReason, Generation, JobResult, VerificationOutcome};

use crate::{
    COORDINATOR_PARALLELIZER,
    metrics::JobOutcome,
    parallelizer::control::Shared,
    verifier::{CheckError, VerifyError},
};

/// Job body: check the unit, then publish the result.
pub(super) async fn run(
    shared: Arc<Shared>,
    unit: CheckableUnit,
    generation: Generation,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let invariant = unit.invariant().clone();
    debug!(
        %invariant,
        %generation,
        timeout_secs = unit.timeout().as_secs(),
        "checking invariant"
    );

    let checked = shared
        .ctx
        .check_isolated(unit.clone(), unit.timeout(), cancel)
        .await;
    let result = into_result(unit, generation, checked);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    shared.ctx.metrics().record_job_completed(
        COORDINATOR_PARALLELIZER,
        JobOutcome::from(&result),
        elapsed_ms,
    );
    trace!(%invariant, %generation, outcome = result.as_label(), elapsed_ms, "job finished");

    if let Err(e) = shared.publish(result).await {
        error!(%invariant, %generation, error = %e, "giving up on result publication");
        shared
            .ctx
            .metrics()
            .record_publish_exhausted(COORDINATOR_PARALLELIZER);
        shared.fatal().cancel();
    }
}

fn into_result(
    unit: CheckableUnit,
    generation: Generation,
    checked: Result<VerificationOutcome, CheckError>,
) -> JobResult {
    match checked {
        Ok(outcome) => JobResult::Success {
            outcome,
            unit,
            generation,
        },
        Err(CheckError::Verify(VerifyError::Timeout(_))) => JobResult::Timeout { unit, generation },
        Err(CheckError::Verify(VerifyError::Interrupted)) => {
            JobResult::Interrupted { unit, generation }
        }
        Err(e) => JobResult::Failure {
            reason: FailureReason::new(e.stage(), format!("{}: {e}", unit.invariant())),
            generation,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::verifier::PrepareError;
    use mcx_model::{FailureStage, Verdict};

    fn unit() -> CheckableUnit {
        CheckableUnit::new("m", "a AFby b".parse().unwrap(), Duration::from_secs(1))
    }

    #[test]
    fn maps_each_check_outcome_to_a_result() {
        let g = Generation::new(3);

        let ok = into_result(
            unit(),
            g,
            Ok(VerificationOutcome::new(Verdict::Safe, "", 0)),
        );
        assert!(ok.is_success());

        let timeout = into_result(
            unit(),
            g,
            Err(VerifyError::Timeout(Duration::from_secs(1)).into()),
        );
        assert!(matches!(timeout, JobResult::Timeout { .. }));

        let interrupted = into_result(unit(), g, Err(VerifyError::Interrupted.into()));
        assert!(matches!(interrupted, JobResult::Interrupted { .. }));

        let failed = into_result(unit(), g, Err(PrepareError::Invalid("bad".into()).into()));
        match failed {
            JobResult::Failure { reason, generation } => {
                assert_eq!(generation, g);
                assert_eq!(reason.stage, FailureStage::Prepare);
                assert!(reason.message.starts_with("a AFby b: "));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
