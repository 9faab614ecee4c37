use crate::metrics::backend::{JobOutcome, MetricsBackend};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_job_started(&self, _: &str) {}

    #[inline(always)]
    fn record_job_completed(&self, _: &str, _: JobOutcome, _: u64) {}

    #[inline(always)]
    fn record_result_discarded(&self, _: &str) {}

    #[inline(always)]
    fn record_publish_exhausted(&self, _: &str) {}

    #[inline(always)]
    fn record_generation(&self, _: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn noop_can_be_called_repeatedly() {
        let metrics = NoOpMetrics;
        for g in 0..1000 {
            metrics.record_job_started("test");
            metrics.record_job_completed("test", JobOutcome::Success, 100);
            metrics.record_result_discarded("test");
            metrics.record_publish_exhausted("test");
            metrics.record_generation(g);
        }
    }
}
