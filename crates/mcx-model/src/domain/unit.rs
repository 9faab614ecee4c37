use std::{fmt, sync::Arc, time::Duration};

use crate::domain::Invariant;

/// Serialized finite-state model handed over by model construction.
///
/// Opaque to the coordination layer; cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource(Arc<str>);

impl ModelSource {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelSource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelSource {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One model-checking job: a model, the invariant to check against it and the
/// time the checker is allowed to spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckableUnit {
    model: ModelSource,
    invariant: Invariant,
    timeout: Duration,
}

impl CheckableUnit {
    pub fn new(model: impl Into<ModelSource>, invariant: Invariant, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            invariant,
            timeout,
        }
    }

    pub fn model(&self) -> &ModelSource {
        &self.model
    }

    pub fn invariant(&self) -> &Invariant {
        &self.invariant
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same unit with a different timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for CheckableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CheckableUnit(inv='{}', timeout={}s)",
            self.invariant,
            self.timeout.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_model_text() {
        let unit = CheckableUnit::new(
            "model text",
            "a AFby b".parse().unwrap(),
            Duration::from_secs(5),
        );
        let copy = unit.clone();

        assert!(std::ptr::eq(unit.model().as_str(), copy.model().as_str()));
    }

    #[test]
    fn with_timeout_replaces_timeout_only() {
        let unit = CheckableUnit::new("m", "a AP b".parse().unwrap(), Duration::from_secs(5))
            .with_timeout(Duration::from_secs(9));

        assert_eq!(unit.timeout(), Duration::from_secs(9));
        assert_eq!(unit.invariant().to_string(), "a AP b");
        assert_eq!(unit.to_string(), "CheckableUnit(inv='a AP b', timeout=9s)");
    }
}
