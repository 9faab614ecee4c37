use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Retry policy for handing a finished job's result to the driver.
///
/// Delays grow exponentially: `first_ms * factor^(attempt - 1)`, capped at `max_ms`.
/// `max_attempts = None` retries forever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishPolicy {
    pub max_attempts: Option<u32>,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            first_ms: 10,
            max_ms: 1_000,
            factor: 2.0,
        }
    }
}

impl PublishPolicy {
    /// Retry until the publish succeeds.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }

    /// Whether attempt number `attempt` (1-based) may be made.
    pub fn allows(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt <= max,
            None => true,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.first_ms as f64 * self.factor.powi(exp);
        let capped = if raw.is_finite() {
            raw.min(self.max_ms as f64)
        } else {
            self.max_ms as f64
        };
        Duration::from_millis(capped as u64)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.max_attempts == Some(0) {
            return Err(ModelError::Invalid(
                "publish.maxAttempts cannot be zero".into(),
            ));
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err(ModelError::Invalid(format!(
                "publish.factor must be >= 1.0, got {}",
                self.factor
            )));
        }
        if self.first_ms > self.max_ms {
            return Err(ModelError::Invalid(
                "publish.firstMs cannot exceed publish.maxMs".into(),
            ));
        }
        Ok(())
    }
}
