pub mod image;
pub mod metrics;
pub mod monitor;
pub mod policy;
pub mod queue;
pub mod runner;
pub mod runtime;
pub mod tasks;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use image::{IMAGE_CHECK_DEBOUNCE, ImageFreshnessGate, ImagePolicy, split_image_ref};
pub use metrics::{MessageOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};
pub use monitor::{Iteration, MonitorConfig, MonitorError, QueueMonitor};
pub use policy::{LabelMatcher, RepositoryFilter};
pub use queue::{DEFAULT_VISIBILITY_TIMEOUT, InMemoryQueue, QueueError, QueueMessage, QueueProvider};
pub use runner::{
    MaxRunners, ReconcileReport, RunnerError, RunnerManager, RunnerManagerConfig, RunnerTimings,
};
pub use runtime::{
    ContainerRuntime, ContainerSpec, ContainerSummary, ImagePuller, Mount, MountKind, PullRequest,
    RegistryAuth, RuntimeError, Volume,
};
pub use tasks::{SupervisorError, queue_monitor_task, runner_guard_task, supervise};
pub use workflow::{Decision, WorkflowHandler, WorkflowProcessor};

pub mod prelude {
    pub use crate::monitor::QueueMonitor;
    pub use crate::queue::{QueueError, QueueProvider};
    pub use crate::runner::{RunnerError, RunnerManager};
    pub use crate::runtime::{ContainerRuntime, ImagePuller, RuntimeError};
    pub use crate::workflow::{WorkflowHandler, WorkflowProcessor};
}
