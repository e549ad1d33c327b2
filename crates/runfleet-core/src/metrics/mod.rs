//! Metrics collection abstraction for the autoscaler.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are injected
//! into the runner manager, workflow processor and queue monitor.
mod backend;
pub use backend::{MessageOutcome, MetricsBackend, MetricsHandle};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
