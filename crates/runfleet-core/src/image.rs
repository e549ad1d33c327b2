//! Debounced check-and-pull of the runner image.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::runtime::{ImagePuller, PullRequest, RegistryAuth};

/// Minimum interval between two pulls of the same image.
pub const IMAGE_CHECK_DEBOUNCE: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_TAG: &str = "latest";

/// Prefix of the progress line the runtime emits once a pull is settled.
const STATUS_PREFIX: &str = "Status:";

#[derive(Debug, Clone)]
pub struct ImagePolicy {
    /// When off, the gate never talks to the runtime.
    pub auto_check_for_updates: bool,
    pub registry_auth: RegistryAuth,
    pub debounce: Duration,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            auto_check_for_updates: true,
            registry_auth: RegistryAuth::default(),
            debounce: IMAGE_CHECK_DEBOUNCE,
        }
    }
}

#[derive(Debug, Default)]
struct Freshness {
    last_check: HashMap<String, Instant>,
    known_tags: Vec<String>,
}

/// Split an image reference into repository and tag (or digest).
///
/// A `:` that is followed by a `/` belongs to a registry port, not a tag.
pub fn split_image_ref(image: &str) -> (&str, &str) {
    if let Some((repo, digest)) = image.split_once('@') {
        return (repo, digest);
    }
    match image.rfind(':') {
        Some(idx) if !image[idx + 1..].contains('/') => (&image[..idx], &image[idx + 1..]),
        _ => (image, DEFAULT_TAG),
    }
}

/// Makes sure the runner image is present and reasonably fresh before a container is created.
pub struct ImageFreshnessGate {
    puller: Arc<dyn ImagePuller>,
    policy: ImagePolicy,
    state: Mutex<Freshness>,
}

impl ImageFreshnessGate {
    pub fn new(puller: Arc<dyn ImagePuller>, policy: ImagePolicy) -> Self {
        Self {
            puller,
            policy,
            state: Mutex::new(Freshness::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Freshness> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tags seen by the most recent inventory query.
    pub fn known_tags(&self) -> Vec<String> {
        self.lock().known_tags.clone()
    }

    /// Returns `false` only when `cancel` fires before the pull settles.
    ///
    /// A locally cached image is re-pulled at most once per debounce window; a
    /// missing one is pulled on every call. Pull errors are logged and ignored.
    pub async fn ensure_image_exists(&self, image: &str, cancel: &CancellationToken) -> bool {
        if !self.policy.auto_check_for_updates {
            debug!(%image, "image update checks disabled");
            return true;
        }

        let (repo, tag) = split_image_ref(image);
        let reference = format!("{repo}:{tag}");
        let present = match self.puller.list_image_tags().await {
            Ok(tags) => {
                let present = tags.iter().any(|t| *t == reference);
                self.lock().known_tags = tags;
                present
            }
            Err(e) => {
                warn!(error = %e, "failed to list local images");
                false
            }
        };

        let now = Instant::now();
        {
            let mut state = self.lock();
            let recent = state
                .last_check
                .get(&reference)
                .is_some_and(|at| now.duration_since(*at) < self.policy.debounce);
            if present && recent {
                debug!(image = %reference, "image checked recently; skipping pull");
                return true;
            }
            state.last_check.insert(reference.clone(), now);
        }

        info!(image = %reference, present, "checking for latest runner image");
        let request = PullRequest {
            image: repo.to_string(),
            tag: tag.to_string(),
            auth: self.policy.registry_auth.clone(),
        };
        let (tx, mut rx) = mpsc::channel::<String>(32);
        let puller = Arc::clone(&self.puller);
        tokio::spawn(async move {
            if let Err(e) = puller.pull_image(&request, tx).await {
                warn!(image = %request.image, tag = %request.tag, error = %e, "image pull failed");
            }
        });

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(image = %reference, "image check canceled");
                    return false;
                }
                line = rx.recv() => match line {
                    Some(status) if status.starts_with(STATUS_PREFIX) => {
                        info!(image = %reference, %status, "runner image ready");
                        return true;
                    }
                    Some(status) => trace!(image = %reference, %status, "pull progress"),
                    None => {
                        debug!(image = %reference, "pull stream closed without status");
                        return true;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRuntime, PullBehavior};

    fn gate(rt: &Arc<FakeRuntime>) -> ImageFreshnessGate {
        ImageFreshnessGate::new(rt.clone(), ImagePolicy::default())
    }

    #[test]
    fn split_handles_tags_ports_and_digests() {
        assert_eq!(split_image_ref("runner"), ("runner", "latest"));
        assert_eq!(split_image_ref("org/runner:2.3"), ("org/runner", "2.3"));
        assert_eq!(
            split_image_ref("localhost:5000/runner"),
            ("localhost:5000/runner", "latest")
        );
        assert_eq!(
            split_image_ref("localhost:5000/runner:v1"),
            ("localhost:5000/runner", "v1")
        );
        assert_eq!(
            split_image_ref("runner@sha256:abc"),
            ("runner", "sha256:abc")
        );
    }

    #[tokio::test]
    async fn disabled_policy_never_touches_runtime() {
        let rt = Arc::new(FakeRuntime::new());
        let policy = ImagePolicy {
            auto_check_for_updates: false,
            ..ImagePolicy::default()
        };
        let gate = ImageFreshnessGate::new(rt.clone(), policy);

        assert!(gate.ensure_image_exists("org/runner", &CancellationToken::new()).await);
        assert_eq!(rt.image_list_calls(), 0);
        assert_eq!(rt.pull_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pulls_at_most_once_per_window() {
        let rt = Arc::new(FakeRuntime::new());
        let gate = gate(&rt);
        let cancel = CancellationToken::new();

        for _ in 0..5 {
            assert!(gate.ensure_image_exists("org/runner:latest", &cancel).await);
        }
        assert_eq!(rt.pull_calls(), 1);

        tokio::time::advance(IMAGE_CHECK_DEBOUNCE + Duration::from_secs(1)).await;
        assert!(gate.ensure_image_exists("org/runner", &cancel).await);
        assert_eq!(rt.pull_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_image_is_pulled_again_after_failure() {
        let rt = Arc::new(FakeRuntime::new());
        rt.set_pull_behavior(PullBehavior::Fail);
        let gate = gate(&rt);
        let cancel = CancellationToken::new();

        assert!(gate.ensure_image_exists("org/runner:latest", &cancel).await);
        assert_eq!(rt.pull_calls(), 1);

        rt.set_pull_behavior(PullBehavior::Succeed);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(gate.ensure_image_exists("org/runner:latest", &cancel).await);
        assert_eq!(rt.pull_calls(), 2);
        assert!(gate.ensure_image_exists("org/runner:latest", &cancel).await);
        assert_eq!(rt.pull_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pull_of_cached_image_is_rate_limited() {
        let rt = Arc::new(FakeRuntime::new());
        rt.add_image("org/runner:latest");
        rt.set_pull_behavior(PullBehavior::Fail);
        let gate = gate(&rt);
        let cancel = CancellationToken::new();

        assert!(gate.ensure_image_exists("org/runner", &cancel).await);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(gate.ensure_image_exists("org/runner", &cancel).await);
        assert_eq!(rt.pull_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_closing_without_status_counts_as_ready() {
        let rt = Arc::new(FakeRuntime::new());
        rt.set_pull_behavior(PullBehavior::SilentClose);
        let gate = gate(&rt);

        assert!(gate.ensure_image_exists("org/runner", &CancellationToken::new()).await);
        assert_eq!(rt.pull_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_pull_fails() {
        let rt = Arc::new(FakeRuntime::new());
        rt.set_pull_behavior(PullBehavior::Hang);
        let gate = gate(&rt);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });
        assert!(!gate.ensure_image_exists("org/runner", &cancel).await);
    }

    #[tokio::test]
    async fn records_known_tags() {
        let rt = Arc::new(FakeRuntime::new());
        rt.add_image("org/runner:latest");
        let gate = gate(&rt);

        gate.ensure_image_exists("org/runner", &CancellationToken::new())
            .await;
        assert_eq!(gate.known_tags(), vec!["org/runner:latest".to_string()]);
    }
}
