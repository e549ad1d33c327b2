use std::fmt;

use time::OffsetDateTime;

/// Observed state of a runner container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    /// Acknowledged by the runtime but never started.
    Created,
    /// Start call succeeded; the runner process is up.
    Running,
    /// Any terminal or transitional runtime state (exited, dead, removing, ...).
    Stopped,
}

impl RunnerStatus {
    /// Map a runtime container state string (`created`, `running`, ...) to a status.
    pub fn from_runtime_state(state: &str) -> Self {
        if state.eq_ignore_ascii_case("created") {
            RunnerStatus::Created
        } else if state.eq_ignore_ascii_case("running") {
            RunnerStatus::Running
        } else {
            RunnerStatus::Stopped
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerStatus::Created => "created",
            RunnerStatus::Running => "running",
            RunnerStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live or intended ephemeral runner.
///
/// Never persisted; always derived from container runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerInstance {
    pub id: String,
    pub name: String,
    /// Repository full name.
    pub repository: String,
    pub job_run_id: i64,
    pub status: RunnerStatus,
    pub created_at: OffsetDateTime,
}
