use thiserror::Error;

use mcx_core::VerifyError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid verifier configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecError> for VerifyError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Io(e) => VerifyError::from(e),
            other => VerifyError::Failed(other.to_string()),
        }
    }
}
