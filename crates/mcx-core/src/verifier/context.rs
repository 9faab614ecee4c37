use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use mcx_model::{CheckableUnit, VerificationOutcome};

use crate::{
    metrics::MetricsHandle,
    verifier::{CheckError, ModelBuilder, Verifier, VerifyError},
};

/// Dependencies shared by every job of a coordinator.
#[derive(Clone)]
pub struct JobContext {
    verifier: Arc<dyn Verifier>,
    builder: Arc<dyn ModelBuilder>,
    metrics: MetricsHandle,
}

impl JobContext {
    /// Create a context with no-op metrics.
    pub fn new(verifier: Arc<dyn Verifier>, builder: Arc<dyn ModelBuilder>) -> Self {
        Self {
            verifier,
            builder,
            metrics: crate::metrics::noop_metrics(),
        }
    }

    pub fn verifier(&self) -> &Arc<dyn Verifier> {
        &self.verifier
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Prepare and verify one unit.
    ///
    /// Returns [`VerifyError::Interrupted`] as soon as `cancel` fires, abandoning the verifier call.
    pub async fn check(
        &self,
        unit: &CheckableUnit,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, CheckError> {
        let input = self.builder.prepare(unit)?;
        trace!(
            invariant = %unit.invariant(),
            input = %input,
            timeout_secs = timeout.as_secs(),
            verifier = self.verifier.name(),
            "checking unit"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(VerifyError::Interrupted.into()),
            res = self.verifier.verify(&input, timeout, cancel) => res.map_err(CheckError::from),
        }
    }

    /// Same as [`JobContext::check`], but runs on its own task so that a panicking
    /// verifier surfaces as [`CheckError::Panic`] instead of tearing down the caller.
    pub async fn check_isolated(
        &self,
        unit: CheckableUnit,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<VerificationOutcome, CheckError> {
        let ctx = self.clone();
        // Cancels the inner task only if this future is dropped before it finishes.
        let guard = cancel.clone().drop_guard();
        let handle = tokio::spawn(async move { ctx.check(&unit, timeout, &cancel).await });

        let res = match handle.await {
            Ok(res) => res,
            Err(e) if e.is_panic() => Err(CheckError::Panic(panic_message(e.into_panic()))),
            Err(_) => Err(VerifyError::Interrupted.into()),
        };
        let _ = guard.disarm();
        res
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("verifier", &self.verifier.name())
            .field("metrics", &"<handle>")
            .finish()
    }
}

impl fmt::Display for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobContext(verifier={})", self.verifier.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::{PreparedInput, TemplateBuilder};

    use async_trait::async_trait;
    use mcx_model::Verdict;

    struct Echo;

    #[async_trait]
    impl Verifier for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn verify(
            &self,
            input: &PreparedInput,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<VerificationOutcome, VerifyError> {
            Ok(VerificationOutcome::new(Verdict::Safe, input.text(), 0))
        }
    }

    struct Hang;

    #[async_trait]
    impl Verifier for Hang {
        fn name(&self) -> &'static str {
            "hang"
        }

        async fn verify(
            &self,
            _input: &PreparedInput,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<VerificationOutcome, VerifyError> {
            std::future::pending().await
        }
    }

    struct Explode;

    #[async_trait]
    impl Verifier for Explode {
        fn name(&self) -> &'static str {
            "explode"
        }

        async fn verify(
            &self,
            _input: &PreparedInput,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<VerificationOutcome, VerifyError> {
            panic!("checker exploded")
        }
    }

    fn ctx(verifier: Arc<dyn Verifier>) -> JobContext {
        JobContext::new(verifier, Arc::new(TemplateBuilder::new()))
    }

    fn unit(model: &str) -> CheckableUnit {
        CheckableUnit::new(model, "a AFby b".parse().unwrap(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn check_passes_prepared_text_to_verifier() {
        let out = ctx(Arc::new(Echo))
            .check(&unit("m {{invariant}}"), Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.output, "m a AFby b");
    }

    #[tokio::test]
    async fn check_reports_prepare_errors() {
        let err = ctx(Arc::new(Echo))
            .check(&unit("no placeholder"), Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Prepare(_)));
    }

    #[tokio::test]
    async fn cancelled_check_is_interrupted() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ctx(Arc::new(Hang))
            .check(&unit("{{invariant}}"), Duration::from_secs(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Verify(VerifyError::Interrupted)));
    }

    #[tokio::test]
    async fn panicking_verifier_is_contained() {
        let err = ctx(Arc::new(Explode))
            .check_isolated(unit("{{invariant}}"), Duration::from_secs(1), CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            CheckError::Panic(msg) => assert!(msg.contains("checker exploded")),
            other => panic!("expected panic error, got {other:?}"),
        }
    }

    #[test]
    fn display_names_verifier() {
        assert_eq!(ctx(Arc::new(Echo)).to_string(), "JobContext(verifier=echo)");
    }
}
