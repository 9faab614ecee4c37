use std::time::Duration;

use thiserror::Error;

use mcx_model::FailureStage;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("cannot prepare checker input: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("verification interrupted")]
    Interrupted,

    #[error("verifier failed: {0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VerifyError {
    fn from(e: std::io::Error) -> Self {
        VerifyError::Io(e.to_string())
    }
}

/// Everything that can stop a job from producing an outcome.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("verification task panicked: {0}")]
    Panic(String),
}

impl CheckError {
    /// Stage reported in a failure result.
    pub fn stage(&self) -> FailureStage {
        match self {
            CheckError::Prepare(_) => FailureStage::Prepare,
            CheckError::Verify(_) => FailureStage::Verify,
            CheckError::Panic(_) => FailureStage::Panic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_uses_seconds() {
        let e = VerifyError::Timeout(Duration::from_secs(30));
        assert_eq!(e.to_string(), "verification exceeded 30s");
    }

    #[test]
    fn check_error_maps_to_stage() {
        let prep: CheckError = PrepareError::Invalid("x".into()).into();
        let verify: CheckError = VerifyError::Failed("x".into()).into();
        let panic = CheckError::Panic("x".into());

        assert_eq!(prep.stage(), FailureStage::Prepare);
        assert_eq!(verify.stage(), FailureStage::Verify);
        assert_eq!(panic.stage(), FailureStage::Panic);
        assert_eq!(verify.to_string(), "verifier failed: x");
    }
}
