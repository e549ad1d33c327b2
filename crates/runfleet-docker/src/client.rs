use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::models::VolumeCreateOptions;
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, CreateImageOptionsBuilder, ListContainersOptionsBuilder,
    ListImagesOptions, PruneVolumesOptions, RemoveContainerOptionsBuilder,
    RemoveVolumeOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures_util::StreamExt;
use runfleet_core::{
    ContainerRuntime, ContainerSpec, ContainerSummary, ImagePuller, PullRequest, RuntimeError,
    Volume,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::DockerError;
use crate::convert;

pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub socket_path: PathBuf,
    /// Applied to every engine call.
    pub request_timeout: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Docker Engine API client over the local control socket.
#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: Docker,
    timeout: Duration,
}

impl DockerClient {
    /// Prepare a client for the configured socket.
    ///
    /// No request is made here; an unreachable daemon surfaces on the first call.
    pub fn new(cfg: &DockerConfig) -> Result<Self, DockerError> {
        let path = cfg.socket_path.to_string_lossy();
        let docker =
            Docker::connect_with_socket(&path, cfg.request_timeout.as_secs(), API_DEFAULT_VERSION)
                .map_err(|e| DockerError::Connect {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(Self {
            docker,
            timeout: cfg.request_timeout,
        })
    }
}

/// Start and stop answer 304 when the container is already in the requested state.
fn not_modified_is_ok(result: Result<(), BollardError>) -> Result<(), DockerError> {
    match result {
        Err(BollardError::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        other => other.map_err(DockerError::from),
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let filters = HashMap::from([("label".to_string(), vec![label.to_string()])]);
        let options = ListContainersOptionsBuilder::new()
            .all(true)
            .filters(&filters)
            .build();
        let items = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(DockerError::from)?;
        let summaries = items
            .into_iter()
            .map(convert::summary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let options = CreateContainerOptionsBuilder::new().name(&spec.name).build();
        let created = self
            .docker
            .create_container(Some(options), convert::create_body(spec))
            .await
            .map_err(DockerError::from)?;
        for w in &created.warnings {
            warn!(container = %spec.name, warning = %w, "docker create warning");
        }
        debug!(container = %spec.name, id = %created.id, "container created");
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .start_container(id, None::<StartContainerOptions>)
            .await;
        Ok(not_modified_is_ok(result)?)
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), RuntimeError> {
        let secs = i32::try_from(grace.as_secs()).unwrap_or(i32::MAX);
        let options = StopContainerOptionsBuilder::new().t(secs).build();
        // The engine holds the request open for the whole grace period.
        let docker = self.docker.clone().with_timeout(self.timeout + grace);
        let result = docker.stop_container(id, Some(options)).await;
        Ok(not_modified_is_ok(result)?)
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptionsBuilder::new()
            .force(true)
            .v(true)
            .build();
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(DockerError::from)?;
        Ok(())
    }

    async fn create_volume(&self, name: Option<&str>) -> Result<Volume, RuntimeError> {
        let request = VolumeCreateOptions {
            name: name.map(str::to_string),
            ..Default::default()
        };
        let created = self
            .docker
            .create_volume(request)
            .await
            .map_err(DockerError::from)?;
        Ok(convert::volume(created))
    }

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, RuntimeError> {
        match self.docker.inspect_volume(name).await.map_err(DockerError::from) {
            Ok(v) => Ok(Some(convert::volume(v))),
            Err(DockerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError> {
        let options = RemoveVolumeOptionsBuilder::new().force(true).build();
        self.docker
            .remove_volume(name, Some(options))
            .await
            .map_err(DockerError::from)?;
        Ok(())
    }

    async fn prune_volumes(&self) -> Result<(), RuntimeError> {
        let report = self
            .docker
            .prune_volumes(None::<PruneVolumesOptions>)
            .await
            .map_err(DockerError::from)?;
        debug!(
            removed = report.volumes_deleted.map(|v| v.len()).unwrap_or_default(),
            "volumes pruned"
        );
        Ok(())
    }
}

#[async_trait]
impl ImagePuller for DockerClient {
    async fn list_image_tags(&self) -> Result<Vec<String>, RuntimeError> {
        let images = self
            .docker
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(DockerError::from)?;
        Ok(images.into_iter().flat_map(|i| i.repo_tags).collect())
    }

    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: mpsc::Sender<String>,
    ) -> Result<(), RuntimeError> {
        let options = CreateImageOptionsBuilder::new()
            .from_image(&request.image)
            .tag(&request.tag)
            .build();
        let credentials = convert::credentials(&request.auth);

        info!(image = %request.image, tag = %request.tag, "pulling image");
        let mut stream = pin!(self.docker.create_image(Some(options), None, credentials));
        while let Some(item) = stream.next().await {
            let info = item.map_err(DockerError::from)?;
            if let Some(status) = convert::pull_status(info)? {
                // The receiver may have stopped listening; the pull still runs to completion.
                let _ = progress.send(status).await;
            }
        }
        Ok(())
    }
}
