use crate::metrics::backend::{MessageOutcome, MetricsBackend};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_job_received(&self, _: &str) {}

    #[inline(always)]
    fn record_runner_created(&self) {}

    #[inline(always)]
    fn record_runner_failed(&self, _: &str) {}

    #[inline(always)]
    fn record_job_completed(&self) {}

    #[inline(always)]
    fn record_message(&self, _: MessageOutcome) {}

    #[inline(always)]
    fn set_queue_depth(&self, _: u64) {}

    #[inline(always)]
    fn set_active_runners(&self, _: u64) {}
}
