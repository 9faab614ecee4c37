use std::sync::Arc;

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, proto::MetricFamily};

use mcx_core::{JobOutcome, MetricsBackend};

/// Prometheus implementation of [`MetricsBackend`].
///
/// Labels are bounded: `coordinator` is `parallelizer` or `runner`, `outcome` is one of
/// `success`, `timeout`, `interrupted`, `failure`.
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_started: CounterVec,
    jobs_completed: CounterVec,
    job_duration: HistogramVec,
    results_discarded: CounterVec,
    publish_exhausted: CounterVec,
    generation: IntGauge,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_started = CounterVec::new(
            Opts::new("mcx_jobs_started_total", "Jobs handed to a worker pool"),
            &["coordinator"],
        )?;
        registry.register(Box::new(jobs_started.clone()))?;

        let jobs_completed = CounterVec::new(
            Opts::new("mcx_jobs_completed_total", "Jobs whose check finished"),
            &["coordinator", "outcome"],
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        // Model checks run from milliseconds to many minutes.
        let job_duration = HistogramVec::new(
            HistogramOpts::new("mcx_job_duration_seconds", "Check duration in seconds")
                .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
            &["coordinator"],
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let results_discarded = CounterVec::new(
            Opts::new(
                "mcx_results_discarded_total",
                "Results dropped because their generation was stale",
            ),
            &["coordinator"],
        )?;
        registry.register(Box::new(results_discarded.clone()))?;

        let publish_exhausted = CounterVec::new(
            Opts::new(
                "mcx_publish_exhausted_total",
                "Results abandoned after the publish retries ran out",
            ),
            &["coordinator"],
        )?;
        registry.register(Box::new(publish_exhausted.clone()))?;

        let generation = IntGauge::new("mcx_generation", "Current parallelizer generation")?;
        registry.register(Box::new(generation.clone()))?;

        Ok(Self {
            jobs_started,
            jobs_completed,
            job_duration,
            results_discarded,
            publish_exhausted,
            generation,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Snapshot for a `/metrics` endpoint.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_started(&self, coordinator: &str) {
        self.jobs_started.with_label_values(&[coordinator]).inc();
    }

    fn record_job_completed(&self, coordinator: &str, outcome: JobOutcome, duration_ms: u64) {
        self.jobs_completed
            .with_label_values(&[coordinator, outcome.as_label()])
            .inc();
        self.job_duration
            .with_label_values(&[coordinator])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_result_discarded(&self, coordinator: &str) {
        self.results_discarded.with_label_values(&[coordinator]).inc();
    }

    fn record_publish_exhausted(&self, coordinator: &str) {
        self.publish_exhausted.with_label_values(&[coordinator]).inc();
    }

    fn record_generation(&self, generation: u64) {
        self.generation.set(i64::try_from(generation).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcx_core::{COORDINATOR_PARALLELIZER, COORDINATOR_RUNNER};

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn started_is_labelled_by_coordinator() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_job_started(COORDINATOR_PARALLELIZER);
        metrics.record_job_started(COORDINATOR_PARALLELIZER);
        metrics.record_job_started(COORDINATOR_RUNNER);

        let families = metrics.gather();
        assert_eq!(family(&families, "mcx_jobs_started_total").get_metric().len(), 2);
        assert_eq!(
            metrics
                .jobs_started
                .with_label_values(&[COORDINATOR_PARALLELIZER])
                .get(),
            2.0
        );
    }

    #[test]
    fn completed_feeds_counter_and_histogram() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_job_completed(COORDINATOR_PARALLELIZER, JobOutcome::Success, 1_500);
        metrics.record_job_completed(COORDINATOR_PARALLELIZER, JobOutcome::Timeout, 60_000);

        let families = metrics.gather();
        assert_eq!(family(&families, "mcx_jobs_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "mcx_job_duration_seconds").get_metric().len(), 1);
    }

    #[test]
    fn discards_and_generation() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_result_discarded(COORDINATOR_PARALLELIZER);
        metrics.record_publish_exhausted(COORDINATOR_PARALLELIZER);
        metrics.record_generation(7);

        assert_eq!(
            metrics
                .results_discarded
                .with_label_values(&[COORDINATOR_PARALLELIZER])
                .get(),
            1.0
        );
        assert_eq!(
            metrics
                .publish_exhausted
                .with_label_values(&[COORDINATOR_PARALLELIZER])
                .get(),
            1.0
        );
        assert_eq!(metrics.generation.get(), 7);
    }

    #[test]
    fn shares_a_custom_registry() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_job_started(COORDINATOR_RUNNER);
        assert!(!registry.gather().is_empty());
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
