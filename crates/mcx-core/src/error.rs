use thiserror::Error;

use mcx_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("parallelizer interrupted")]
    Interrupted,

    #[error("result publication failed after {attempts} attempts")]
    PublishExhausted { attempts: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ModelError> for CoreError {
    fn from(e: ModelError) -> Self {
        CoreError::Config(e.to_string())
    }
}
