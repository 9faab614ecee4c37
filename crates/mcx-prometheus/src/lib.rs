//! Prometheus backend for the `mcx-core` coordinators.
//!
//! [`PrometheusMetrics`] implements [`mcx_core::MetricsBackend`]; hand it to a
//! [`mcx_core::JobContext`] and expose [`PrometheusMetrics::gather`] however the host
//! application serves metrics.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use mcx_core::MetricsHandle;
//! use mcx_prometheus::{Encoder, PrometheusMetrics, TextEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//!
//! let mut buf = Vec::new();
//! TextEncoder::new().encode(&metrics.gather(), &mut buf)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `mcx_jobs_started_total{coordinator}` - Counter
//! - `mcx_jobs_completed_total{coordinator, outcome}` - Counter
//! - `mcx_job_duration_seconds{coordinator}` - Histogram
//! - `mcx_results_discarded_total{coordinator}` - Counter
//! - `mcx_publish_exhausted_total{coordinator}` - Counter
//! - `mcx_generation` - Gauge
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
