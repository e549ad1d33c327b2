use std::sync::Arc;

/// Queue message disposition for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Message handled and deleted from the queue.
    Deleted,
    /// Message left on the queue for redelivery.
    Deferred,
    /// Message could not be decoded or processing errored.
    Failed,
}

impl MessageOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            MessageOutcome::Deleted => "deleted",
            MessageOutcome::Deferred => "deferred",
            MessageOutcome::Failed => "failed",
        }
    }
}

/// Backend metrics collection interface.
///
/// This trait abstracts metrics collection across different backends.
/// Implementations are handed to the runner manager, the workflow processor
/// and the queue monitor at construction time.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a decoded job event.
    ///
    /// # Arguments
    /// - `action`: Event action (`queued`, `completed`, ...)
    fn record_job_received(&self, action: &str);
    /// Record a runner container that was created and started.
    fn record_runner_created(&self);
    /// Record a failed runner provisioning attempt.
    ///
    /// # Arguments
    /// - `reason`: Error category, see [`crate::RunnerError::kind`]
    fn record_runner_failed(&self, reason: &str);
    /// Record a completed job event.
    fn record_job_completed(&self);
    /// Record what happened to a dequeued message.
    fn record_message(&self, outcome: MessageOutcome);
    /// Set the last observed approximate queue depth.
    fn set_queue_depth(&self, depth: u64);
    /// Set the last observed number of managed runner containers.
    fn set_active_runners(&self, count: u64);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
