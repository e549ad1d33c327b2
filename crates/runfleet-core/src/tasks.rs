//! taskvisor wiring for the two long-lived loops.
//!
//! The consume loop and the guard loop each run as one supervised task. Both
//! return `Ok` on cancellation, so the supervisor only restarts them when the
//! consume loop fails to initialize its queue.
use std::sync::Arc;
use std::time::Duration;

use taskvisor::{
    BackoffPolicy, JitterPolicy, RestartPolicy, Subscribe, Supervisor, SupervisorConfig,
    TaskError, TaskFn, TaskRef, TaskSpec,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::monitor::QueueMonitor;
use crate::runner::RunnerManager;

pub const QUEUE_MONITOR_TASK: &str = "runfleet-queue-monitor";
pub const RUNNER_GUARD_TASK: &str = "runfleet-runner-guard";

#[derive(Debug, Error)]
#[error("supervisor error: {0}")]
pub struct SupervisorError(String);

fn restart_backoff() -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_secs(1),
        max: Duration::from_secs(60),
        jitter: JitterPolicy::Equal,
        factor: 2.0,
    }
}

/// Supervised task running [`QueueMonitor::run`].
pub fn queue_monitor_task(monitor: Arc<QueueMonitor>) -> TaskSpec {
    let task: TaskRef = TaskFn::arc(QUEUE_MONITOR_TASK, move |ctx: CancellationToken| {
        let monitor = Arc::clone(&monitor);
        async move {
            monitor.run(ctx).await.map_err(|e| TaskError::Fail {
                reason: format!("queue monitor failed: {e}"),
            })
        }
    });
    TaskSpec::new(task, RestartPolicy::OnFailure, restart_backoff(), None)
}

/// Supervised task running [`RunnerManager::run_guard`].
pub fn runner_guard_task(manager: Arc<RunnerManager>) -> TaskSpec {
    let task: TaskRef = TaskFn::arc(RUNNER_GUARD_TASK, move |ctx: CancellationToken| {
        let manager = Arc::clone(&manager);
        async move {
            manager.run_guard(ctx).await;
            Ok::<(), TaskError>(())
        }
    });
    TaskSpec::new(task, RestartPolicy::OnFailure, restart_backoff(), None)
}

/// Run `tasks` under one supervisor until shutdown.
///
/// The supervisor owns OS signal handling and cancels every task on shutdown.
pub async fn supervise(
    subscribers: Vec<Arc<dyn Subscribe>>,
    tasks: Vec<TaskSpec>,
) -> Result<(), SupervisorError> {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();
    info!(tasks = tasks.len(), "starting supervisor");
    sup.run(tasks)
        .await
        .map_err(|e| SupervisorError(e.to_string()))
}
