//! In-memory container runtime for tests.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use runfleet_model::Labels;
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::runtime::{
    ContainerRuntime, ContainerSpec, ContainerSummary, ImagePuller, MountKind, PullRequest,
    RuntimeError, Volume,
};

/// How [`FakeRuntime::pull_image`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullBehavior {
    /// Emit progress and a final `Status:` line.
    Succeed,
    /// Return an error without emitting anything.
    Fail,
    /// Never return.
    Hang,
    /// Return without emitting anything.
    SilentClose,
}

#[derive(Debug)]
struct Container {
    summary: ContainerSummary,
    spec: Option<ContainerSpec>,
}

#[derive(Debug)]
struct State {
    containers: Vec<Container>,
    volumes: Vec<Volume>,
    images: Vec<String>,
    pull_behavior: PullBehavior,
    start_failures: usize,
    stop_failures: usize,
    create_delay: Option<Duration>,
    fail_list: bool,
    started: Vec<String>,
    stopped: Vec<String>,
    removed: Vec<String>,
}

impl State {
    fn volumes_in_use(&self) -> Vec<String> {
        self.containers
            .iter()
            .filter_map(|c| c.spec.as_ref())
            .flat_map(|s| s.mounts.iter())
            .filter(|m| m.kind == MountKind::Volume)
            .map(|m| m.source.clone())
            .collect()
    }
}

/// Runtime double implementing both [`ContainerRuntime`] and [`ImagePuller`].
#[derive(Debug)]
pub struct FakeRuntime {
    state: Mutex<State>,
    seq: AtomicUsize,
    image_list_calls: AtomicUsize,
    pull_calls: AtomicUsize,
    prune_calls: AtomicUsize,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                containers: Vec::new(),
                volumes: Vec::new(),
                images: Vec::new(),
                pull_behavior: PullBehavior::Succeed,
                start_failures: 0,
                stop_failures: 0,
                create_delay: None,
                fail_list: false,
                started: Vec::new(),
                stopped: Vec::new(),
                removed: Vec::new(),
            }),
            seq: AtomicUsize::new(0),
            image_list_calls: AtomicUsize::new(0),
            pull_calls: AtomicUsize::new(0),
            prune_calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next(&self) -> usize {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Add a container directly, bypassing create.
    pub fn insert_container(
        &self,
        name: &str,
        state: &str,
        created: OffsetDateTime,
        labels: Labels,
    ) -> String {
        let id = format!("c{}", self.next());
        self.lock().containers.push(Container {
            summary: ContainerSummary {
                id: id.clone(),
                names: vec![format!("/{name}")],
                image: "runner".into(),
                state: state.into(),
                labels,
                created,
            },
            spec: None,
        });
        id
    }

    /// Drop a container as if it exited with auto-remove.
    pub fn finish(&self, id: &str) {
        self.lock().containers.retain(|c| c.summary.id != id);
    }

    pub fn containers(&self) -> Vec<ContainerSummary> {
        self.lock().containers.iter().map(|c| c.summary.clone()).collect()
    }

    pub fn spec_of(&self, name: &str) -> Option<ContainerSpec> {
        self.lock()
            .containers
            .iter()
            .find(|c| c.summary.name() == name)
            .and_then(|c| c.spec.clone())
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.lock().volumes.clone()
    }

    pub fn add_image(&self, reference: &str) {
        self.lock().images.push(reference.to_string());
    }

    pub fn set_pull_behavior(&self, behavior: PullBehavior) {
        self.lock().pull_behavior = behavior;
    }

    /// Make the next `n` start calls fail.
    pub fn fail_starts(&self, n: usize) {
        self.lock().start_failures = n;
    }

    /// Make the next `n` stop calls fail.
    pub fn fail_stops(&self, n: usize) {
        self.lock().stop_failures = n;
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.lock().create_delay = Some(delay);
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.lock().stopped.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.lock().removed.clone()
    }

    pub fn image_list_calls(&self) -> usize {
        self.image_list_calls.load(Ordering::Relaxed)
    }

    pub fn pull_calls(&self) -> usize {
        self.pull_calls.load(Ordering::Relaxed)
    }

    pub fn prune_calls(&self) -> usize {
        self.prune_calls.load(Ordering::Relaxed)
    }
}

fn matches_label(labels: &Labels, filter: &str) -> bool {
    match filter.split_once('=') {
        Some((k, v)) => labels.get(k) == Some(v),
        None => labels.get(filter).is_some(),
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let state = self.lock();
        if state.fail_list {
            return Err(RuntimeError::Transport("connection refused".into()));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| matches_label(&c.summary.labels, label))
            .map(|c| c.summary.clone())
            .collect())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let delay = self.lock().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let id = format!("c{}", self.next());
        let mut state = self.lock();
        if state.containers.iter().any(|c| c.summary.name() == spec.name) {
            return Err(RuntimeError::Api {
                status: 409,
                message: format!("name '{}' already in use", spec.name),
            });
        }
        state.containers.push(Container {
            summary: ContainerSummary {
                id: id.clone(),
                names: vec![format!("/{}", spec.name)],
                image: spec.image.clone(),
                state: "created".into(),
                labels: spec.labels.clone(),
                created: OffsetDateTime::now_utc(),
            },
            spec: Some(spec.clone()),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        if state.start_failures > 0 {
            state.start_failures -= 1;
            return Err(RuntimeError::Api {
                status: 500,
                message: "start failed".into(),
            });
        }
        let Some(c) = state.containers.iter_mut().find(|c| c.summary.id == id) else {
            return Err(RuntimeError::NotFound(id.to_string()));
        };
        c.summary.state = "running".into();
        state.started.push(id.to_string());
        Ok(())
    }

    async fn stop_container(&self, id: &str, _grace: Duration) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        if state.stop_failures > 0 {
            state.stop_failures -= 1;
            return Err(RuntimeError::Api {
                status: 500,
                message: "stop failed".into(),
            });
        }
        let Some(c) = state.containers.iter_mut().find(|c| c.summary.id == id) else {
            return Err(RuntimeError::NotFound(id.to_string()));
        };
        c.summary.state = "exited".into();
        state.stopped.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        let before = state.containers.len();
        state
            .containers
            .retain(|c| c.summary.id != id && c.summary.name() != id);
        if state.containers.len() == before {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn create_volume(&self, name: Option<&str>) -> Result<Volume, RuntimeError> {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("vol-{}", self.next()),
        };
        let volume = Volume {
            mountpoint: format!("/var/lib/docker/volumes/{name}/_data"),
            name,
        };
        self.lock().volumes.push(volume.clone());
        Ok(volume)
    }

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, RuntimeError> {
        Ok(self.lock().volumes.iter().find(|v| v.name == name).cloned())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        if state.volumes_in_use().iter().any(|v| v == name) {
            return Err(RuntimeError::Api {
                status: 409,
                message: format!("volume '{name}' is in use"),
            });
        }
        let before = state.volumes.len();
        state.volumes.retain(|v| v.name != name);
        if state.volumes.len() == before {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn prune_volumes(&self) -> Result<(), RuntimeError> {
        self.prune_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        let in_use = state.volumes_in_use();
        state.volumes.retain(|v| in_use.contains(&v.name));
        Ok(())
    }
}

#[async_trait]
impl ImagePuller for FakeRuntime {
    async fn list_image_tags(&self) -> Result<Vec<String>, RuntimeError> {
        self.image_list_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock().images.clone())
    }

    async fn pull_image(
        &self,
        request: &PullRequest,
        progress: mpsc::Sender<String>,
    ) -> Result<(), RuntimeError> {
        self.pull_calls.fetch_add(1, Ordering::Relaxed);
        let behavior = self.lock().pull_behavior;
        let reference = format!("{}:{}", request.image, request.tag);
        match behavior {
            PullBehavior::Succeed => {
                let _ = progress
                    .send(format!("Pulling from {}", request.image))
                    .await;
                self.add_image(&reference);
                let _ = progress
                    .send(format!("Status: Downloaded newer image for {reference}"))
                    .await;
                Ok(())
            }
            PullBehavior::Fail => Err(RuntimeError::Api {
                status: 500,
                message: "registry unavailable".into(),
            }),
            PullBehavior::Hang => std::future::pending().await,
            PullBehavior::SilentClose => Ok(()),
        }
    }
}
