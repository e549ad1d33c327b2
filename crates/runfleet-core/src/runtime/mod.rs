//! Container runtime contracts.
//!
//! The core only talks to the runtime through [`ContainerRuntime`] and
//! [`ImagePuller`]; a Docker Engine implementation lives in `runfleet-docker`
//! and an in-memory double in [`crate::testing`].
mod error;
pub use error::RuntimeError;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use runfleet_model::{Env, Labels};
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Container as reported by a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    /// Raw runtime state (`created`, `running`, `exited`, ...).
    pub state: String,
    pub labels: Labels,
    pub created: OffsetDateTime,
}

impl ContainerSummary {
    /// First reported name without the leading slash.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or(&self.id)
    }

    pub fn is_created(&self) -> bool {
        self.state.eq_ignore_ascii_case("created")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// Host path bind mount.
    Bind,
    /// Named volume mount.
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub kind: MountKind,
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Bind,
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn volume(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Volume,
            source: name.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// Everything needed to create one runner container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Env,
    pub labels: Labels,
    pub mounts: Vec<Mount>,
    pub auto_remove: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    /// Host path backing the volume.
    pub mountpoint: String,
}

/// Registry credentials sent along with a pull.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: Option<String>,
    pub password: String,
}

impl RegistryAuth {
    pub fn token(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub image: String,
    pub tag: String,
    pub auth: RegistryAuth,
}

/// Container lifecycle operations used by the runner manager.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// List all containers (any state) carrying `label`.
    ///
    /// `label` is either a bare key or `key=value`.
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start a container. Starting an already running container is not an error.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), RuntimeError>;

    /// Force-remove a container by id or name, including its anonymous volumes.
    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Create a volume; `None` lets the runtime pick a name.
    async fn create_volume(&self, name: Option<&str>) -> Result<Volume, RuntimeError>;

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, RuntimeError>;

    /// Remove a named volume. Fails while a container still uses it.
    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError>;

    /// Remove volumes not referenced by any container.
    async fn prune_volumes(&self) -> Result<(), RuntimeError>;
}

/// Image inventory and pulls.
#[async_trait]
pub trait ImagePuller: Send + Sync + 'static {
    /// All `repo:tag` references cached locally.
    async fn list_image_tags(&self) -> Result<Vec<String>, RuntimeError>;

    /// Pull an image, forwarding every status line to `progress`.
    ///
    /// Returns once the runtime closes the progress stream.
    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: mpsc::Sender<String>,
    ) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_name_strips_slash() {
        let c = ContainerSummary {
            id: "abc".into(),
            names: vec!["/runner-1".into()],
            image: "img".into(),
            state: "Created".into(),
            labels: Labels::new(),
            created: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(c.name(), "runner-1");
        assert!(c.is_created());
    }

    #[test]
    fn registry_auth_debug_hides_password() {
        let auth = RegistryAuth::token("s3cret");
        assert!(!format!("{auth:?}").contains("s3cret"));
    }
}
