//! Prometheus metrics backend for the runfleet autoscaler.
//!
//! [`PrometheusMetrics`] implements [`runfleet_core::MetricsBackend`] on its own
//! [`prometheus::Registry`]; [`PrometheusMetrics::encode_text`] renders the
//! exposition body for a `/metrics` route.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use runfleet_core::{MetricsBackend, MetricsHandle};
//! use runfleet_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! handle.record_runner_created();
//!
//! let body = metrics.encode_text()?;
//! assert!(body.contains("runfleet_runners_created_total 1"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `runfleet_jobs_received_total{action}` - Counter
//! - `runfleet_jobs_completed_total` - Counter
//! - `runfleet_runners_created_total` - Counter
//! - `runfleet_runner_failures_total{reason}` - Counter
//! - `runfleet_queue_messages_total{outcome}` - Counter
//! - `runfleet_queue_depth` - Gauge
//! - `runfleet_active_runners` - Gauge
mod backend;
pub use backend::PrometheusMetrics;
