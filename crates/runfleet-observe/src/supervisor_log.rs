//! Supervisor event logging.
//!
//! Turns taskvisor lifecycle events for the daemon's long-running tasks
//! (queue monitor, runner guard) into `tracing` records.

use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

const QUEUE_CAPACITY: usize = 1024;

/// Logs every supervisor event with a severity matching its impact on the fleet.
#[derive(Debug, Default, Clone, Copy)]
pub struct SupervisorLog;

#[async_trait]
impl Subscribe for SupervisorLog {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "supervisor-log"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("-");
    let reason = e.reason.as_deref().unwrap_or("-");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => info!(task, attempt, "task starting"),
        EventKind::TaskStopped => debug!(task, "task stopped"),
        EventKind::TaskFailed => error!(task, attempt, reason, "task failed"),
        EventKind::TimeoutHit => {
            warn!(task, timeout_ms = e.timeout_ms.unwrap_or(0), "task timed out")
        }
        EventKind::BackoffScheduled => warn!(
            task,
            attempt,
            delay_ms = e.delay_ms.unwrap_or(0),
            reason,
            "task restart scheduled"
        ),
        EventKind::ActorExhausted => warn!(task, reason, "task will not be restarted"),
        EventKind::ActorDead => error!(task, reason, "task terminated permanently"),

        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all tasks stopped"),
        EventKind::GraceExceeded => warn!("tasks still running after shutdown grace"),

        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(task, reason, "event subscriber failure")
        }

        EventKind::TaskAdded => debug!(task, "task registered"),
        EventKind::TaskRemoved => debug!(task, "task removed"),
        EventKind::TaskAddRequested | EventKind::TaskRemoveRequested => {
            trace!(task, "task registry change requested")
        }

        EventKind::ControllerRejected => warn!(task, reason, "controller rejected task"),
        EventKind::ControllerSubmitted | EventKind::ControllerSlotTransition => {
            trace!(task, reason, "controller event")
        }
    }
}
