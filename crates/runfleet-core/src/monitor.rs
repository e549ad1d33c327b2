//! Single-threaded consume loop over the job queue.
//!
//! Messages are processed one at a time. A message the handler declines is left
//! on the queue and remembered; once a later peek shows it at the head again
//! (typically after its visibility timeout) the loop waits before taking it.
//! Messages that fail to decode, or whose
//! processing errors, are deleted and followed by a backoff.
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use runfleet_model::{JobEvent, ModelError};
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{MessageOutcome, MetricsHandle, noop_metrics};
use crate::queue::{QueueError, QueueMessage, QueueProvider};
use crate::workflow::WorkflowHandler;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("message decode error: {0}")]
    Decode(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Wait before retaking a message the handler just declined.
    pub poison_delay: Duration,
    /// Wait after a failed iteration.
    pub error_backoff: Duration,
    /// Wait when the queue is empty.
    pub idle_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poison_delay: Duration::from_secs(10),
            error_backoff: Duration::from_secs(10),
            idle_delay: Duration::from_secs(10),
        }
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Nothing visible on the queue.
    Idle,
    /// Message handled and deleted.
    Handled { message_id: String },
    /// Message declined and left for redelivery.
    Deferred { message_id: String },
    /// Decode, processing or queue failure; the message (if any) was deleted.
    Failed,
    /// Cancellation observed before a message was taken.
    Canceled,
}

pub struct QueueMonitor {
    queue: Arc<dyn QueueProvider>,
    handler: Arc<dyn WorkflowHandler>,
    cfg: MonitorConfig,
    metrics: MetricsHandle,
    last_deferred: Mutex<Option<String>>,
}

impl QueueMonitor {
    pub fn new(queue: Arc<dyn QueueProvider>, handler: Arc<dyn WorkflowHandler>) -> Self {
        Self {
            queue,
            handler,
            cfg: MonitorConfig::default(),
            metrics: noop_metrics(),
            last_deferred: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, cfg: MonitorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Initialize the queue, then consume until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MonitorError> {
        self.queue.initialize().await?;
        info!("queue monitor started");
        while !cancel.is_cancelled() {
            let iteration = self.process_next(&cancel).await;
            debug!(?iteration, "queue iteration finished");
        }
        info!("queue monitor stopped");
        Ok(())
    }

    /// Run one iteration. Never fails: errors are logged, the offending
    /// message is deleted and the call sleeps for the error backoff.
    #[instrument(skip_all)]
    pub async fn process_next(&self, cancel: &CancellationToken) -> Iteration {
        let mut taken: Option<QueueMessage> = None;
        match self.try_process(cancel, &mut taken).await {
            Ok(iteration) => iteration,
            Err(e) => {
                self.metrics.record_message(MessageOutcome::Failed);
                match taken {
                    Some(message) => {
                        error!(message_id = %message.id, error = %e, "failed to process message; deleting it");
                        if let Err(e) = self.queue.delete(&message).await {
                            warn!(message_id = %message.id, error = %e, "failed to delete message");
                        }
                    }
                    None => error!(error = %e, "queue operation failed"),
                }
                pause(self.cfg.error_backoff, cancel).await;
                Iteration::Failed
            }
        }
    }

    async fn try_process(
        &self,
        cancel: &CancellationToken,
        taken: &mut Option<QueueMessage>,
    ) -> Result<Iteration, MonitorError> {
        let last = self.deferred();
        if let Some(last) = last {
            let repeat = self.queue.peek().await?.is_some_and(|m| m.id == last);
            if repeat {
                info!(message_id = %last, "same message declined last time; delaying");
                self.set_deferred(None);
                pause(self.cfg.poison_delay, cancel).await;
            }
        }
        if cancel.is_cancelled() {
            return Ok(Iteration::Canceled);
        }

        let Some(message) = self.queue.receive().await? else {
            self.refresh_depth().await;
            pause(self.cfg.idle_delay, cancel).await;
            return Ok(Iteration::Idle);
        };
        let message = taken.insert(message);
        debug!(
            message_id = %message.id,
            dequeue_count = message.dequeue_count,
            "message received"
        );

        let event = JobEvent::decode(&message.content)?;
        self.metrics.record_job_received(event.action());

        let iteration = if self.handler.handle(&event, cancel).await {
            self.queue.delete(message).await?;
            self.metrics.record_message(MessageOutcome::Deleted);
            debug!(message_id = %message.id, "message handled");
            Iteration::Handled {
                message_id: message.id.clone(),
            }
        } else {
            self.set_deferred(Some(message.id.clone()));
            self.metrics.record_message(MessageOutcome::Deferred);
            info!(message_id = %message.id, "message not handled; leaving it for redelivery");
            Iteration::Deferred {
                message_id: message.id.clone(),
            }
        };
        self.refresh_depth().await;
        Ok(iteration)
    }

    fn deferred(&self) -> Option<String> {
        self.last_deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_deferred(&self, id: Option<String>) {
        *self
            .last_deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }

    async fn refresh_depth(&self) {
        match self.queue.approximate_count().await {
            Ok(depth) => self.metrics.set_queue_depth(depth as u64),
            Err(e) => debug!(error = %e, "queue depth unavailable"),
        }
    }
}

async fn pause(duration: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = sleep(duration) => {}
    }
}
