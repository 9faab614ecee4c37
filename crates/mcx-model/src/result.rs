use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{CheckableUnit, Generation, Invariant},
    error::{ModelError, ModelResult},
};

/// Checker verdict for one invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// The model satisfies the invariant.
    Safe,
    /// The checker found a violating execution.
    Unsafe,
    /// The checker finished without a recognisable answer.
    Unknown,
}

impl FromStr for Verdict {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Verdict::Safe),
            "unsafe" => Ok(Verdict::Unsafe),
            "unknown" => Ok(Verdict::Unknown),
            other => Err(ModelError::UnknownVerdict(other.to_string())),
        }
    }
}

/// What a completed checker run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub verdict: Verdict,
    /// Raw checker stdout.
    pub output: String,
    pub elapsed_ms: u64,
}

impl VerificationOutcome {
    pub fn new(verdict: Verdict, output: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            verdict,
            output: output.into(),
            elapsed_ms,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.verdict == Verdict::Safe
    }
}

/// Where a job failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Model construction could not produce checker input.
    Prepare,
    /// The checker process itself errored.
    Verify,
    /// The job body panicked.
    Panic,
    /// The coordinator loop terminated.
    Coordinator,
}

impl FailureStage {
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureStage::Prepare => "prepare",
            FailureStage::Verify => "verify",
            FailureStage::Panic => "panic",
            FailureStage::Coordinator => "coordinator",
        }
    }
}

/// Error carried by [`JobResult::Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub stage: FailureStage,
    pub message: String,
}

impl FailureReason {
    pub fn new(stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.stage.as_label(), self.message)
    }
}

/// Result of one job, as delivered to the driver.
#[derive(Debug, Clone)]
pub enum JobResult {
    Success {
        outcome: VerificationOutcome,
        unit: CheckableUnit,
        generation: Generation,
    },
    Timeout {
        unit: CheckableUnit,
        generation: Generation,
    },
    Interrupted {
        unit: CheckableUnit,
        generation: Generation,
    },
    Failure {
        reason: FailureReason,
        generation: Generation,
    },
}

impl JobResult {
    /// Generation the result was produced under.
    pub fn generation(&self) -> Generation {
        match self {
            JobResult::Success { generation, .. }
            | JobResult::Timeout { generation, .. }
            | JobResult::Interrupted { generation, .. }
            | JobResult::Failure { generation, .. } => *generation,
        }
    }

    /// The unit the job checked; `None` for failures.
    pub fn unit(&self) -> Option<&CheckableUnit> {
        match self {
            JobResult::Success { unit, .. }
            | JobResult::Timeout { unit, .. }
            | JobResult::Interrupted { unit, .. } => Some(unit),
            JobResult::Failure { .. } => None,
        }
    }

    pub fn invariant(&self) -> Option<&Invariant> {
        self.unit().map(CheckableUnit::invariant)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    /// Short label for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobResult::Success { .. } => "success",
            JobResult::Timeout { .. } => "timeout",
            JobResult::Interrupted { .. } => "interrupted",
            JobResult::Failure { .. } => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn unit() -> CheckableUnit {
        CheckableUnit::new("m", "a AFby b".parse().unwrap(), Duration::from_secs(1))
    }

    #[test]
    fn accessors_cover_every_variant() {
        let g = Generation::new(2);
        let results = [
            JobResult::Success {
                outcome: VerificationOutcome::new(Verdict::Safe, "", 1),
                unit: unit(),
                generation: g,
            },
            JobResult::Timeout {
                unit: unit(),
                generation: g,
            },
            JobResult::Interrupted {
                unit: unit(),
                generation: g,
            },
            JobResult::Failure {
                reason: FailureReason::new(FailureStage::Verify, "boom"),
                generation: g,
            },
        ];

        for r in &results {
            assert_eq!(r.generation(), g);
        }
        assert!(results[0].is_success());
        assert!(results[3].unit().is_none());
        assert_eq!(
            results[1].invariant().map(ToString::to_string).as_deref(),
            Some("a AFby b")
        );
        let labels: Vec<_> = results.iter().map(JobResult::as_label).collect();
        assert_eq!(labels, ["success", "timeout", "interrupted", "failure"]);
    }

    #[test]
    fn failure_reason_display_includes_stage() {
        let r = FailureReason::new(FailureStage::Prepare, "no placeholder");
        assert_eq!(r.to_string(), "prepare failure: no placeholder");
    }

    #[test]
    fn verdict_parses_case_insensitive() {
        assert_eq!("SAFE".parse::<Verdict>().unwrap(), Verdict::Safe);
        assert_eq!(" unsafe ".parse::<Verdict>().unwrap(), Verdict::Unsafe);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn outcome_serde_is_camel_case() {
        let outcome = VerificationOutcome::new(Verdict::Unsafe, "trace", 42);
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"verdict":"unsafe","output":"trace","elapsedMs":42}"#
        );
    }
}
