use std::time::Duration;

use thiserror::Error;

/// Why a race did not produce a winner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no checkable units to run")]
    NoUnits,

    #[error("no unit succeeded within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("every unit failed: {0}")]
    Failed(String),
}

impl RunnerError {
    /// Label for logs.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::NoUnits => "no_units",
            RunnerError::Timeout(_) => "timeout",
            RunnerError::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_uses_seconds() {
        let e = RunnerError::Timeout(Duration::from_secs(5));
        assert_eq!(e.to_string(), "no unit succeeded within 5s");
        assert_eq!(e.as_label(), "timeout");
    }
}
