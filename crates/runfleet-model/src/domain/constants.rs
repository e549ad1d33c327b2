//! Well-known container label keys.
//!
//! Every container created for the fleet carries these labels. The container runtime is the only
//! source of truth for fleet state, so the labels are what reconciliation and capacity checks read back.

/// Marks a container as fleet-managed (`autoscaler=true`).
pub const LABEL_MANAGED: &str = "autoscaler";

/// Full name of the repository the runner was created for.
pub const LABEL_REPOSITORY: &str = "autoscaler.repository";

/// Generated runner/container name.
pub const LABEL_CONTAINER: &str = "autoscaler.container";

/// Workflow run id of the job that triggered the runner.
pub const LABEL_JOB_RUN: &str = "autoscaler.jobrun";
