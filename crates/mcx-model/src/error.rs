use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown invariant connector: {0}")]
    UnknownConnector(String),

    #[error("malformed invariant: {0} (expected: '<first> <connector> <second>')")]
    MalformedInvariant(String),

    #[error("unknown verdict: {0}")]
    UnknownVerdict(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
