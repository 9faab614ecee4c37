use std::sync::Arc;

use mcx_model::JobResult;

use crate::verifier::{CheckError, VerifyError};

/// How a job ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Timeout,
    Interrupted,
    Failure,
}

impl JobOutcome {
    /// Label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::Timeout => "timeout",
            JobOutcome::Interrupted => "interrupted",
            JobOutcome::Failure => "failure",
        }
    }
}

impl From<&CheckError> for JobOutcome {
    fn from(e: &CheckError) -> Self {
        match e {
            CheckError::Verify(VerifyError::Timeout(_)) => JobOutcome::Timeout,
            CheckError::Verify(VerifyError::Interrupted) => JobOutcome::Interrupted,
            _ => JobOutcome::Failure,
        }
    }
}

impl From<&JobResult> for JobOutcome {
    fn from(r: &JobResult) -> Self {
        match r {
            JobResult::Success { .. } => JobOutcome::Success,
            JobResult::Timeout { .. } => JobOutcome::Timeout,
            JobResult::Interrupted { .. } => JobOutcome::Interrupted,
            JobResult::Failure { .. } => JobOutcome::Failure,
        }
    }
}

/// Backend metrics collection interface.
///
/// `coordinator` is one of [`crate::COORDINATOR_PARALLELIZER`] or [`crate::COORDINATOR_RUNNER`].
pub trait MetricsBackend: Send + Sync + 'static {
    /// A job was handed to a worker pool.
    fn record_job_started(&self, coordinator: &str);

    /// A job body finished, before its result is published.
    fn record_job_completed(&self, coordinator: &str, outcome: JobOutcome, duration_ms: u64);

    /// A finished job's result was dropped as stale.
    fn record_result_discarded(&self, coordinator: &str);

    /// A job gave up publishing its result; the coordinator is about to stop.
    fn record_publish_exhausted(&self, coordinator: &str);

    /// The parallelizer moved to a new generation.
    fn record_generation(&self, generation: u64);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
