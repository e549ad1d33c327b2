//! Capacity-bounded lifecycle of ephemeral runner containers.
//!
//! The container runtime is the only source of truth: every admission check
//! re-lists fleet-labelled containers, and the guard loop repairs drift
//! (containers stuck in `created`, runaway jobs) on a fixed schedule.
mod config;
pub use config::{
    DEFAULT_CONTROL_SOCKET, DEFAULT_GITHUB_URL, DEFAULT_MAX_RUNNERS, DEFAULT_TOOL_CACHE_VOLUME,
    MaxRunners, RunnerManagerConfig, RunnerTimings, TOOL_CACHE_TARGET,
};

mod error;
pub use error::RunnerError;

mod id;
pub use id::RunnerNames;

use std::sync::Arc;

use runfleet_model::{
    Env, LABEL_CONTAINER, LABEL_JOB_RUN, LABEL_MANAGED, LABEL_REPOSITORY, Labels, RunnerInstance,
    RunnerStatus,
};
use time::OffsetDateTime;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::image::ImageFreshnessGate;
use crate::metrics::{MetricsHandle, noop_metrics};
use crate::runtime::{ContainerRuntime, ContainerSpec, ContainerSummary, Mount, Volume};

/// Mount target anchoring the work volume to the container so it is removed with it.
const WORK_VOLUME_ANCHOR: &str = "/runner/work-anchor";

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Fleet-labelled containers observed.
    pub observed: usize,
    /// Containers found in `created` and started.
    pub started: usize,
    /// Containers past the age limit and stopped.
    pub stopped: usize,
    /// Runtime calls that failed during the pass.
    pub errors: usize,
}

pub struct RunnerManager {
    runtime: Arc<dyn ContainerRuntime>,
    images: ImageFreshnessGate,
    cfg: RunnerManagerConfig,
    names: RunnerNames,
    metrics: MetricsHandle,
}

impl RunnerManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        images: ImageFreshnessGate,
        cfg: RunnerManagerConfig,
    ) -> Self {
        let names = RunnerNames::new(&cfg.coordinator_hostname);
        Self {
            runtime,
            images,
            cfg,
            names,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn max_runners(&self) -> MaxRunners {
        self.cfg.max_runners
    }

    pub fn config(&self) -> &RunnerManagerConfig {
        &self.cfg
    }

    async fn managed_containers(&self) -> Result<Vec<ContainerSummary>, RunnerError> {
        let containers = self.runtime.list_containers(LABEL_MANAGED).await?;
        self.metrics.set_active_runners(containers.len() as u64);
        Ok(containers)
    }

    /// Number of fleet-owned containers in any state.
    pub async fn count_active(&self) -> Result<usize, RunnerError> {
        Ok(self.managed_containers().await?.len())
    }

    pub async fn can_admit(&self) -> Result<bool, RunnerError> {
        let active = self.count_active().await?;
        Ok(self.cfg.max_runners.admits(active))
    }

    /// Block until a slot is free or `cancel` fires.
    ///
    /// Runtime errors count as "no slot" and are retried on the next poll.
    pub async fn wait_for_slot(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        let mut logged = false;
        loop {
            match self.can_admit().await {
                Ok(true) => return Ok(()),
                Ok(false) if !logged => {
                    info!(max = %self.cfg.max_runners, "fleet at capacity; waiting for a free slot");
                    logged = true;
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "capacity check failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(RunnerError::Canceled),
                _ = sleep(self.cfg.timings.admission_poll) => {}
            }
        }
    }

    /// Fleet-owned containers as runner instances.
    pub async fn list_runners(&self) -> Result<Vec<RunnerInstance>, RunnerError> {
        Ok(self
            .managed_containers()
            .await?
            .iter()
            .map(to_instance)
            .collect())
    }

    /// Provision and start one runner for `repository`.
    ///
    /// Admission is re-checked against the runtime first. Image check, create and
    /// start share one deadline; whatever was created is force-removed when that
    /// deadline passes, `cancel` fires, or every start attempt fails.
    #[instrument(skip_all, fields(repository = %repository, run_id = job_run_id))]
    pub async fn create_runner(
        &self,
        repository: &str,
        runner_name: Option<&str>,
        job_run_id: i64,
        cancel: &CancellationToken,
    ) -> Result<RunnerInstance, RunnerError> {
        let result = self
            .provision(repository, runner_name, job_run_id, cancel)
            .await;
        match &result {
            Ok(runner) => {
                self.metrics.record_runner_created();
                info!(runner = %runner.name, container = %runner.id, "runner started");
            }
            Err(e) => {
                self.metrics.record_runner_failed(e.kind());
                warn!(error = %e, "runner not created");
            }
        }
        result
    }

    async fn provision(
        &self,
        repository: &str,
        runner_name: Option<&str>,
        job_run_id: i64,
        cancel: &CancellationToken,
    ) -> Result<RunnerInstance, RunnerError> {
        let active = self.count_active().await?;
        if let MaxRunners::Limited(max) = self.cfg.max_runners {
            if active >= max {
                return Err(RunnerError::AtCapacity { active, max });
            }
        }

        let name = match runner_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => self.names.next(repository, job_run_id),
        };
        let deadline = Instant::now() + self.cfg.timings.create_deadline;

        let mut work_volume = None;
        let created = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunnerError::Canceled),
            r = timeout_at(deadline, self.create(repository, &name, job_run_id, &mut work_volume, cancel)) => match r {
                Ok(r) => r,
                Err(_) => Err(RunnerError::Timeout { name: name.clone() }),
            },
        };
        let id = match created {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, RunnerError::Timeout { .. } | RunnerError::Canceled) {
                    self.discard(&name).await;
                }
                if let Some(volume) = work_volume {
                    self.discard_volume(&volume).await;
                }
                return Err(e);
            }
        };

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunnerError::Canceled),
            r = timeout_at(deadline, self.start_with_retries(&id, &name)) => match r {
                Ok(r) => r,
                Err(_) => Err(RunnerError::Timeout { name: name.clone() }),
            },
        };
        if let Err(e) = started {
            self.discard(&id).await;
            if let Some(volume) = work_volume {
                self.discard_volume(&volume).await;
            }
            return Err(e);
        }

        Ok(RunnerInstance {
            id,
            name,
            repository: repository.to_string(),
            job_run_id,
            status: RunnerStatus::Running,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Create the container. The per-runner work volume is recorded in
    /// `work_volume` as soon as it exists so the caller can remove it on failure.
    async fn create(
        &self,
        repository: &str,
        name: &str,
        job_run_id: i64,
        work_volume: &mut Option<String>,
        cancel: &CancellationToken,
    ) -> Result<String, RunnerError> {
        if !self.images.ensure_image_exists(&self.cfg.image, cancel).await {
            return Err(RunnerError::ImageUnavailable(self.cfg.image.clone()));
        }

        let cache = self.tool_cache_volume().await?;
        let work = self.runtime.create_volume(None).await?;
        *work_volume = Some(work.name.clone());

        let spec = self.container_spec(repository, name, job_run_id, &work, &cache);
        debug!(runner = %name, image = %spec.image, "creating runner container");
        Ok(self.runtime.create_container(&spec).await?)
    }

    async fn start_with_retries(&self, id: &str, name: &str) -> Result<(), RunnerError> {
        let attempts = self.cfg.timings.start_attempts.max(1);
        for attempt in 1..=attempts {
            match self.runtime.start_container(id).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(runner = %name, attempt, error = %e, "runner start failed"),
            }
            if attempt < attempts {
                sleep(self.cfg.timings.start_retry_delay).await;
            }
        }
        Err(RunnerError::StartFailed {
            name: name.to_string(),
            attempts,
        })
    }

    /// Best-effort force removal of a half-created runner.
    async fn discard(&self, id_or_name: &str) {
        match self.runtime.remove_container(id_or_name).await {
            Ok(()) => info!(container = %id_or_name, "removed unfinished runner"),
            Err(e) => debug!(container = %id_or_name, error = %e, "nothing to remove"),
        }
    }

    async fn discard_volume(&self, name: &str) {
        match self.runtime.remove_volume(name).await {
            Ok(()) => debug!(volume = %name, "removed unused work volume"),
            Err(e) => warn!(volume = %name, error = %e, "failed to remove work volume"),
        }
    }

    async fn tool_cache_volume(&self) -> Result<Volume, RunnerError> {
        let name = self.cfg.tool_cache_volume.as_str();
        if let Some(volume) = self.runtime.find_volume(name).await? {
            return Ok(volume);
        }
        info!(volume = %name, "creating tool cache volume");
        Ok(self.runtime.create_volume(Some(name)).await?)
    }

    fn container_spec(
        &self,
        repository: &str,
        name: &str,
        job_run_id: i64,
        work: &Volume,
        cache: &Volume,
    ) -> ContainerSpec {
        let mut env = Env::new();
        env.push(
            "REPO_URL",
            format!("{}/{}", self.cfg.github_url.trim_end_matches('/'), repository),
        )
        .push("ACCESS_TOKEN", self.cfg.access_token.as_str())
        .push("RUNNER_WORKDIR", work.mountpoint.as_str())
        .push("RUNNER_NAME", name)
        .push("EPHEMERAL", "TRUE")
        .push("DISABLE_AUTO_UPDATE", "TRUE")
        .push("LABELS", self.cfg.labels.to_field());

        let mut labels = Labels::new();
        labels
            .insert(LABEL_MANAGED, "true")
            .insert(LABEL_REPOSITORY, repository)
            .insert(LABEL_CONTAINER, name)
            .insert(LABEL_JOB_RUN, job_run_id.to_string());

        let socket = self.cfg.control_socket.as_str();
        ContainerSpec {
            name: name.to_string(),
            image: self.cfg.image.clone(),
            env,
            labels,
            mounts: vec![
                Mount::bind(socket, socket),
                Mount::bind(work.mountpoint.as_str(), work.mountpoint.as_str()),
                Mount::bind(cache.mountpoint.as_str(), cache.mountpoint.as_str()),
                Mount::volume(work.name.as_str(), WORK_VOLUME_ANCHOR),
                Mount::volume(cache.name.as_str(), TOOL_CACHE_TARGET),
            ],
            auto_remove: true,
        }
    }

    /// Start containers stuck in `created` and stop those past the age limit.
    #[instrument(skip(self))]
    pub async fn reconcile_once(&self) -> Result<ReconcileReport, RunnerError> {
        let containers = self.managed_containers().await?;
        let mut report = ReconcileReport {
            observed: containers.len(),
            ..ReconcileReport::default()
        };
        if containers.is_empty() {
            debug!("no fleet containers to reconcile");
            return Ok(report);
        }

        for c in containers.iter().filter(|c| c.is_created()) {
            match self.runtime.start_container(&c.id).await {
                Ok(()) => {
                    info!(container = %c.name(), "started stuck runner");
                    report.started += 1;
                }
                Err(e) => {
                    warn!(container = %c.name(), error = %e, "failed to start stuck runner");
                    report.errors += 1;
                }
            }
        }

        let now = OffsetDateTime::now_utc();
        let max_age = self.cfg.timings.max_age;
        for c in containers.iter().filter(|c| c.created + max_age < now) {
            match self
                .runtime
                .stop_container(&c.id, self.cfg.timings.stop_grace)
                .await
            {
                Ok(()) => {
                    info!(container = %c.name(), created = %c.created, "stopped aged runner");
                    report.stopped += 1;
                }
                Err(e) => {
                    warn!(container = %c.name(), error = %e, "failed to stop aged runner");
                    report.errors += 1;
                }
            }
        }
        Ok(report)
    }

    /// Reconcile on a fixed interval until `cancel` fires.
    pub async fn run_guard(&self, cancel: CancellationToken) {
        info!(interval = ?self.cfg.timings.guard_interval, "runner guard started");
        loop {
            if let Err(e) = self.reconcile_once().await {
                warn!(error = %e, "reconciliation pass failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.cfg.timings.guard_interval) => {}
            }
        }
        info!("runner guard stopped");
    }

    /// Remove volumes no container references. Never fails the caller.
    pub async fn prune_storage(&self) {
        match self.runtime.prune_volumes().await {
            Ok(()) => debug!("pruned unused volumes"),
            Err(e) => warn!(error = %e, "volume prune failed"),
        }
    }
}

fn to_instance(c: &ContainerSummary) -> RunnerInstance {
    RunnerInstance {
        id: c.id.clone(),
        name: c
            .labels
            .get(LABEL_CONTAINER)
            .unwrap_or_else(|| c.name())
            .to_string(),
        repository: c.labels.get(LABEL_REPOSITORY).unwrap_or_default().to_string(),
        job_run_id: c
            .labels
            .get(LABEL_JOB_RUN)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        status: RunnerStatus::from_runtime_state(&c.state),
        created_at: c.created,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use runfleet_model::LabelSet;

    use super::*;
    use crate::image::ImagePolicy;
    use crate::runtime::RuntimeError;
    use crate::testing::{FakeRuntime, PullBehavior};

    fn manager(rt: &Arc<FakeRuntime>, max: MaxRunners) -> RunnerManager {
        let mut cfg = RunnerManagerConfig::new("org/runner:latest", LabelSet::with_arch(["linux"], "x64"));
        cfg.max_runners = max;
        cfg.access_token = "token".into();
        cfg.coordinator_hostname = "host".into();
        let gate = ImageFreshnessGate::new(rt.clone(), ImagePolicy::default());
        RunnerManager::new(rt.clone(), gate, cfg)
    }

    fn volume_names(rt: &FakeRuntime) -> Vec<String> {
        rt.volumes().into_iter().map(|v| v.name).collect()
    }

    fn managed(repo: &str, run: i64) -> Labels {
        let mut labels = Labels::new();
        labels
            .insert(LABEL_MANAGED, "true")
            .insert(LABEL_REPOSITORY, repo)
            .insert(LABEL_JOB_RUN, run.to_string());
        labels
    }

    #[tokio::test(start_paused = true)]
    async fn creates_runner_with_full_container_spec() {
        let rt = Arc::new(FakeRuntime::new());
        let m = manager(&rt, MaxRunners::Limited(2));

        let runner = m
            .create_runner("org/repo", None, 42, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(runner.name, "host-org-repo-42-1");
        assert_eq!(runner.status, RunnerStatus::Running);

        let spec = rt.spec_of(&runner.name).unwrap();
        assert!(spec.auto_remove);
        assert_eq!(spec.env.get("REPO_URL"), Some("https://github.com/org/repo"));
        assert_eq!(spec.env.get("ACCESS_TOKEN"), Some("token"));
        assert_eq!(spec.env.get("EPHEMERAL"), Some("TRUE"));
        assert_eq!(spec.env.get("DISABLE_AUTO_UPDATE"), Some("TRUE"));
        assert_eq!(spec.env.get("LABELS"), Some("linux,self-hosted,x64"));
        assert_eq!(spec.labels.get(LABEL_MANAGED), Some("true"));
        assert_eq!(spec.labels.get(LABEL_JOB_RUN), Some("42"));
        assert!(spec.mounts.iter().any(|m| m.target == DEFAULT_CONTROL_SOCKET));
        assert!(spec.mounts.iter().any(|m| m.target == TOOL_CACHE_TARGET));
        assert_eq!(rt.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tool_cache_volume_is_shared() {
        let rt = Arc::new(FakeRuntime::new());
        let m = manager(&rt, MaxRunners::Unbounded);
        let cancel = CancellationToken::new();

        m.create_runner("org/a", None, 1, &cancel).await.unwrap();
        m.create_runner("org/b", None, 2, &cancel).await.unwrap();

        let caches = rt
            .volumes()
            .into_iter()
            .filter(|v| v.name == DEFAULT_TOOL_CACHE_VOLUME)
            .count();
        assert_eq!(caches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_refused_at_capacity() {
        let rt = Arc::new(FakeRuntime::new());
        rt.insert_container("busy", "running", OffsetDateTime::now_utc(), managed("org/x", 1));
        let m = manager(&rt, MaxRunners::Limited(1));

        let err = m
            .create_runner("org/repo", None, 42, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::AtCapacity { active: 1, max: 1 }));
        assert_eq!(rt.containers().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_retried() {
        let rt = Arc::new(FakeRuntime::new());
        rt.fail_starts(3);
        let m = manager(&rt, MaxRunners::Unbounded);

        let runner = m
            .create_runner("org/repo", Some("named"), 7, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(runner.name, "named");
        assert_eq!(rt.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_start_removes_container() {
        let rt = Arc::new(FakeRuntime::new());
        rt.fail_starts(100);
        let m = manager(&rt, MaxRunners::Unbounded);

        let err = m
            .create_runner("org/repo", None, 7, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::StartFailed { attempts: 6, .. }));
        assert!(rt.containers().is_empty());
        assert_eq!(rt.removed().len(), 1);
        assert_eq!(volume_names(&rt), vec![DEFAULT_TOOL_CACHE_VOLUME.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_create_removes_work_volume() {
        let rt = Arc::new(FakeRuntime::new());
        rt.insert_container("taken", "running", OffsetDateTime::now_utc(), Labels::new());
        let m = manager(&rt, MaxRunners::Unbounded);

        let err = m
            .create_runner("org/repo", Some("taken"), 7, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Runtime(RuntimeError::Api { status: 409, .. })));
        assert_eq!(volume_names(&rt), vec![DEFAULT_TOOL_CACHE_VOLUME.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_image_creates_no_volumes() {
        let rt = Arc::new(FakeRuntime::new());
        rt.set_pull_behavior(PullBehavior::Hang);
        let m = manager(&rt, MaxRunners::Unbounded);

        let err = m
            .create_runner("org/repo", None, 7, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(rt.volumes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_create_times_out_and_cleans_up() {
        let rt = Arc::new(FakeRuntime::new());
        rt.set_create_delay(Duration::from_secs(60));
        let m = manager(&rt, MaxRunners::Unbounded);

        let err = m
            .create_runner("org/repo", None, 7, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(rt.containers().is_empty());
        assert_eq!(volume_names(&rt), vec![DEFAULT_TOOL_CACHE_VOLUME.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_slot_blocks_until_capacity_frees() {
        let rt = Arc::new(FakeRuntime::new());
        let busy = rt.insert_container("busy", "running", OffsetDateTime::now_utc(), managed("org/x", 1));
        let m = manager(&rt, MaxRunners::Limited(1));
        let cancel = CancellationToken::new();

        let waiter = {
            let rt = rt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                rt.finish(&busy);
            })
        };
        let started = Instant::now();
        m.wait_for_slot(&cancel).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_slot_keeps_polling_through_list_errors() {
        let rt = Arc::new(FakeRuntime::new());
        rt.fail_list(true);
        let m = manager(&rt, MaxRunners::Limited(1));
        let cancel = CancellationToken::new();

        let recover = {
            let rt = rt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                rt.fail_list(false);
            })
        };
        let started = Instant::now();
        m.wait_for_slot(&cancel).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));
        recover.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_slot_honours_cancellation() {
        let rt = Arc::new(FakeRuntime::new());
        rt.insert_container("busy", "running", OffsetDateTime::now_utc(), managed("org/x", 1));
        let m = manager(&rt, MaxRunners::Limited(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            m.wait_for_slot(&cancel).await,
            Err(RunnerError::Canceled)
        ));
    }

    #[tokio::test]
    async fn reconcile_starts_stuck_and_stops_aged() {
        let rt = Arc::new(FakeRuntime::new());
        let now = OffsetDateTime::now_utc();
        let stuck = rt.insert_container("stuck", "created", now, managed("org/a", 1));
        let aged = rt.insert_container(
            "aged",
            "running",
            now - time::Duration::hours(2),
            managed("org/b", 2),
        );
        rt.insert_container("young", "running", now, managed("org/c", 3));
        rt.insert_container("foreign", "created", now, Labels::new());
        let m = manager(&rt, MaxRunners::Unbounded);

        let report = m.reconcile_once().await.unwrap();
        assert_eq!(report.observed, 3);
        assert_eq!(report.started, 1);
        assert_eq!(report.stopped, 1);
        assert_eq!(rt.started(), vec![stuck]);
        assert_eq!(rt.stopped(), vec![aged]);
    }

    #[tokio::test]
    async fn reconcile_counts_failed_starts_and_stops() {
        let rt = Arc::new(FakeRuntime::new());
        let now = OffsetDateTime::now_utc();
        rt.insert_container("stuck", "created", now, managed("org/a", 1));
        let aged = rt.insert_container(
            "aged",
            "running",
            now - time::Duration::hours(2),
            managed("org/b", 2),
        );
        rt.fail_starts(1);
        rt.fail_stops(1);
        let m = manager(&rt, MaxRunners::Unbounded);

        let report = m.reconcile_once().await.unwrap();
        assert_eq!(report.observed, 2);
        assert_eq!(report.started, 0);
        assert_eq!(report.stopped, 0);
        assert_eq!(report.errors, 2);

        let report = m.reconcile_once().await.unwrap();
        assert_eq!(report.started, 1);
        assert_eq!(report.stopped, 1);
        assert_eq!(report.errors, 0);
        assert_eq!(rt.stopped(), vec![aged]);
    }

    #[tokio::test]
    async fn reconcile_with_no_containers_is_a_no_op() {
        let rt = Arc::new(FakeRuntime::new());
        let m = manager(&rt, MaxRunners::Unbounded);
        assert_eq!(m.reconcile_once().await.unwrap(), ReconcileReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn guard_keeps_running_while_idle() {
        let rt = Arc::new(FakeRuntime::new());
        let m = Arc::new(manager(&rt, MaxRunners::Unbounded));
        let cancel = CancellationToken::new();

        let guard = {
            let m = m.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { m.run_guard(cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(5 * 60)).await;
        rt.insert_container("late", "created", OffsetDateTime::now_utc(), managed("org/a", 1));
        tokio::time::sleep(Duration::from_secs(3 * 60)).await;
        assert_eq!(rt.started().len(), 1);

        cancel.cancel();
        guard.await.unwrap();
    }

    #[tokio::test]
    async fn lists_runners_from_labels() {
        let rt = Arc::new(FakeRuntime::new());
        rt.insert_container("r1", "Created", OffsetDateTime::now_utc(), managed("org/a", 9));
        let m = manager(&rt, MaxRunners::Unbounded);

        let runners = m.list_runners().await.unwrap();
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].repository, "org/a");
        assert_eq!(runners[0].job_run_id, 9);
        assert_eq!(runners[0].status, RunnerStatus::Created);
        assert_eq!(runners[0].name, "r1");
    }

    #[tokio::test]
    async fn prune_never_fails_caller() {
        let rt = Arc::new(FakeRuntime::new());
        let m = manager(&rt, MaxRunners::Unbounded);
        m.prune_storage().await;
        assert_eq!(rt.prune_calls(), 1);
    }
}
