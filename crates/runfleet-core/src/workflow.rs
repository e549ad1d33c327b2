//! Per-event decision: should this fleet run the job, and is there room for it.
use std::sync::Arc;

use async_trait::async_trait;
use runfleet_model::{JobContext, JobEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{MetricsHandle, noop_metrics};
use crate::policy::{LabelMatcher, RepositoryFilter, is_self_hosted};
use crate::runner::RunnerManager;

/// Outcome of processing one job event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Action this fleet does not act on.
    Ignored,
    /// Job does not target self-hosted runners.
    NotSelfHosted,
    /// Job needs labels this fleet lacks; another fleet may take it.
    LabelMismatch,
    /// Repository is not allowed to use this fleet.
    RepositoryDenied,
    /// A runner was created and started.
    RunnerCreated { name: String },
    /// No runner could be created.
    RunnerFailed,
    /// Completion cleanup was triggered.
    Completed,
}

impl Decision {
    /// `true` when the message may be removed from the queue.
    pub fn is_handled(&self) -> bool {
        !matches!(self, Decision::LabelMismatch | Decision::RunnerFailed)
    }
}

/// Message handler driven by the queue monitor.
#[async_trait]
pub trait WorkflowHandler: Send + Sync + 'static {
    /// Returns `true` when the event is fully handled and can be acknowledged.
    async fn handle(&self, event: &JobEvent, cancel: &CancellationToken) -> bool;
}

pub struct WorkflowProcessor {
    manager: Arc<RunnerManager>,
    labels: LabelMatcher,
    filter: RepositoryFilter,
    metrics: MetricsHandle,
}

impl WorkflowProcessor {
    pub fn new(manager: Arc<RunnerManager>, labels: LabelMatcher, filter: RepositoryFilter) -> Self {
        Self {
            manager,
            labels,
            filter,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    #[instrument(skip_all, fields(action = %event.action()))]
    pub async fn decide(&self, event: &JobEvent, cancel: &CancellationToken) -> Decision {
        match event {
            JobEvent::Queued(ctx) => self.on_queued(ctx, cancel).await,
            JobEvent::Completed(ctx) => {
                info!(
                    repository = %ctx.repository.full_name,
                    run_id = ctx.job.run_id,
                    "workflow job completed"
                );
                self.metrics.record_job_completed();
                self.manager.prune_storage().await;
                Decision::Completed
            }
            JobEvent::Other { .. } => {
                debug!("ignoring workflow event");
                Decision::Ignored
            }
        }
    }

    async fn on_queued(&self, ctx: &JobContext, cancel: &CancellationToken) -> Decision {
        let repository = ctx.repository.full_name.as_str();
        let job = &ctx.job;

        if !is_self_hosted(&job.labels) {
            debug!(%repository, job = %job.name, "job is not for self-hosted runners");
            return Decision::NotSelfHosted;
        }
        if !self.labels.has_all_required_labels(&job.labels) {
            info!(
                %repository,
                job = %job.name,
                labels = ?job.labels,
                "job labels not served by this fleet"
            );
            return Decision::LabelMismatch;
        }
        if !self.filter.is_allowed(repository) {
            info!(%repository, "repository not allowed");
            return Decision::RepositoryDenied;
        }

        info!(%repository, job = %job.name, run_id = job.run_id, "provisioning runner");
        if let Err(e) = self.manager.wait_for_slot(cancel).await {
            warn!(%repository, error = %e, "gave up waiting for a free slot");
            return Decision::RunnerFailed;
        }
        match self
            .manager
            .create_runner(repository, None, job.run_id, cancel)
            .await
        {
            Ok(runner) => Decision::RunnerCreated { name: runner.name },
            Err(_) => Decision::RunnerFailed,
        }
    }
}

#[async_trait]
impl WorkflowHandler for WorkflowProcessor {
    async fn handle(&self, event: &JobEvent, cancel: &CancellationToken) -> bool {
        self.decide(event, cancel).await.is_handled()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use runfleet_model::{
        FilterPolicy, LABEL_MANAGED, LabelSet, Labels, ListRule, Repository, WorkflowJob,
    };
    use time::OffsetDateTime;

    use super::*;
    use crate::image::{ImageFreshnessGate, ImagePolicy};
    use crate::runner::{MaxRunners, RunnerManagerConfig};
    use crate::testing::FakeRuntime;

    fn processor(rt: &Arc<FakeRuntime>, max: MaxRunners) -> WorkflowProcessor {
        let labels = LabelSet::with_arch(["linux"], "x64");
        let mut cfg = RunnerManagerConfig::new("org/runner", labels.clone());
        cfg.max_runners = max;
        cfg.coordinator_hostname = "host".into();
        let gate = ImageFreshnessGate::new(rt.clone(), ImagePolicy::default());
        let manager = Arc::new(RunnerManager::new(rt.clone(), gate, cfg));
        let policy = FilterPolicy::new(ListRule::allow().with_prefix("org/"), ListRule::deny());
        WorkflowProcessor::new(manager, LabelMatcher::new(labels), RepositoryFilter::new(&policy))
    }

    fn ctx(repo: &str, labels: &[&str]) -> JobContext {
        JobContext {
            job: WorkflowJob {
                name: "build".into(),
                labels: labels.iter().map(|l| l.to_string()).collect(),
                run_id: 42,
            },
            repository: Repository {
                full_name: repo.into(),
                name: repo.rsplit('/').next().unwrap_or(repo).into(),
            },
        }
    }

    fn queued(repo: &str, labels: &[&str]) -> JobEvent {
        JobEvent::Queued(ctx(repo, labels))
    }

    #[tokio::test(start_paused = true)]
    async fn matching_job_creates_runner() {
        let rt = Arc::new(FakeRuntime::new());
        let p = processor(&rt, MaxRunners::Limited(2));

        let decision = p
            .decide(&queued("org/repo", &["self-hosted", "linux"]), &CancellationToken::new())
            .await;
        assert_eq!(
            decision,
            Decision::RunnerCreated {
                name: "host-org-repo-42-1".into()
            }
        );
        assert_eq!(rt.containers().len(), 1);
    }

    #[tokio::test]
    async fn label_mismatch_is_redelivered() {
        let rt = Arc::new(FakeRuntime::new());
        let p = processor(&rt, MaxRunners::Unbounded);

        let handled = p
            .handle(&queued("org/repo", &["self-hosted", "windows"]), &CancellationToken::new())
            .await;
        assert!(!handled);
        assert!(rt.containers().is_empty());
    }

    #[tokio::test]
    async fn hosted_jobs_and_denied_repositories_are_dropped() {
        let rt = Arc::new(FakeRuntime::new());
        let p = processor(&rt, MaxRunners::Unbounded);
        let cancel = CancellationToken::new();

        assert_eq!(
            p.decide(&queued("org/repo", &["ubuntu-latest"]), &cancel).await,
            Decision::NotSelfHosted
        );
        assert_eq!(
            p.decide(&queued("other/repo", &["self-hosted"]), &cancel).await,
            Decision::RepositoryDenied
        );
        assert!(rt.containers().is_empty());
    }

    #[tokio::test]
    async fn completed_always_handled_and_prunes() {
        let rt = Arc::new(FakeRuntime::new());
        let p = processor(&rt, MaxRunners::Unbounded);

        let event = JobEvent::Completed(ctx("denied/repo", &["windows"]));
        assert!(p.handle(&event, &CancellationToken::new()).await);
        assert_eq!(rt.prune_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_action_is_ignored() {
        let rt = Arc::new(FakeRuntime::new());
        let p = processor(&rt, MaxRunners::Unbounded);

        let event = JobEvent::Other {
            action: Some("in_progress".into()),
        };
        assert!(p.handle(&event, &CancellationToken::new()).await);
        assert!(p.handle(&JobEvent::Other { action: None }, &CancellationToken::new()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn full_fleet_blocks_until_slot_frees() {
        let rt = Arc::new(FakeRuntime::new());
        let mut labels = Labels::new();
        labels.insert(LABEL_MANAGED, "true");
        let busy = rt.insert_container("busy", "running", OffsetDateTime::now_utc(), labels);
        let p = processor(&rt, MaxRunners::Limited(1));

        let release = {
            let rt = rt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                rt.finish(&busy);
            })
        };
        let started = tokio::time::Instant::now();
        let handled = p
            .handle(&queued("org/repo", &["self-hosted", "linux"]), &CancellationToken::new())
            .await;
        assert!(handled);
        assert!(started.elapsed() >= Duration::from_secs(30));
        release.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn creation_failure_is_redelivered() {
        let rt = Arc::new(FakeRuntime::new());
        rt.fail_starts(100);
        let p = processor(&rt, MaxRunners::Unbounded);

        let handled = p
            .handle(&queued("org/repo", &["self-hosted"]), &CancellationToken::new())
            .await;
        assert!(!handled);
    }

    #[tokio::test]
    async fn canceled_wait_is_redelivered() {
        let rt = Arc::new(FakeRuntime::new());
        let mut labels = Labels::new();
        labels.insert(LABEL_MANAGED, "true");
        rt.insert_container("busy", "running", OffsetDateTime::now_utc(), labels);
        let p = processor(&rt, MaxRunners::Limited(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            p.decide(&queued("org/repo", &["self-hosted"]), &cancel).await,
            Decision::RunnerFailed
        );
    }
}
