use std::fmt;
use std::time::Duration;

use runfleet_model::LabelSet;

/// Limit used when none is configured.
pub const DEFAULT_MAX_RUNNERS: usize = 4;

pub const DEFAULT_TOOL_CACHE_VOLUME: &str = "runfleet-toolcache";
pub const DEFAULT_CONTROL_SOCKET: &str = "/var/run/docker.sock";
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
pub const TOOL_CACHE_TARGET: &str = "/opt/hostedtoolcache";

/// Ceiling on concurrently managed runner containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRunners {
    /// At most `n` runners; `n` is at least 1.
    Limited(usize),
    Unbounded,
}

impl MaxRunners {
    /// Normalize a configured value: `0` becomes 1, negative means no limit.
    pub fn from_configured(value: i64) -> Self {
        match value {
            v if v < 0 => MaxRunners::Unbounded,
            0 => MaxRunners::Limited(1),
            v => MaxRunners::Limited(usize::try_from(v).unwrap_or(usize::MAX)),
        }
    }

    pub fn admits(&self, active: usize) -> bool {
        match self {
            MaxRunners::Limited(max) => active < *max,
            MaxRunners::Unbounded => true,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            MaxRunners::Limited(max) => Some(*max),
            MaxRunners::Unbounded => None,
        }
    }
}

impl Default for MaxRunners {
    fn default() -> Self {
        MaxRunners::Limited(DEFAULT_MAX_RUNNERS)
    }
}

impl fmt::Display for MaxRunners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxRunners::Limited(n) => write!(f, "{n}"),
            MaxRunners::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Fixed intervals of the runner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerTimings {
    /// Poll interval while waiting for a free slot.
    pub admission_poll: Duration,
    /// Deadline for image check, create and start of one runner.
    pub create_deadline: Duration,
    /// Start attempts including the first one.
    pub start_attempts: u32,
    pub start_retry_delay: Duration,
    /// Grace period handed to the runtime when stopping an aged runner.
    pub stop_grace: Duration,
    /// Runners older than this are stopped by the guard loop.
    pub max_age: Duration,
    pub guard_interval: Duration,
}

impl Default for RunnerTimings {
    fn default() -> Self {
        Self {
            admission_poll: Duration::from_secs(3),
            create_deadline: Duration::from_secs(20),
            start_attempts: 6,
            start_retry_delay: Duration::from_secs(1),
            stop_grace: Duration::from_secs(20),
            max_age: Duration::from_secs(60 * 60),
            guard_interval: Duration::from_secs(2 * 60),
        }
    }
}

/// Static configuration of a [`super::RunnerManager`].
#[derive(Clone)]
pub struct RunnerManagerConfig {
    pub image: String,
    pub max_runners: MaxRunners,
    /// Credential handed to the runner for registration.
    pub access_token: String,
    pub labels: LabelSet,
    pub coordinator_hostname: String,
    pub tool_cache_volume: String,
    pub control_socket: String,
    pub github_url: String,
    pub timings: RunnerTimings,
}

impl RunnerManagerConfig {
    pub fn new(image: impl Into<String>, labels: LabelSet) -> Self {
        Self {
            image: image.into(),
            max_runners: MaxRunners::default(),
            access_token: String::new(),
            labels,
            coordinator_hostname: String::new(),
            tool_cache_volume: DEFAULT_TOOL_CACHE_VOLUME.to_string(),
            control_socket: DEFAULT_CONTROL_SOCKET.to_string(),
            github_url: DEFAULT_GITHUB_URL.to_string(),
            timings: RunnerTimings::default(),
        }
    }
}

impl fmt::Debug for RunnerManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerManagerConfig")
            .field("image", &self.image)
            .field("max_runners", &self.max_runners)
            .field("access_token", &"<redacted>")
            .field("labels", &self.labels)
            .field("coordinator_hostname", &self.coordinator_hostname)
            .field("tool_cache_volume", &self.tool_cache_volume)
            .field("control_socket", &self.control_socket)
            .field("github_url", &self.github_url)
            .field("timings", &self.timings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_runners_normalization() {
        assert_eq!(MaxRunners::from_configured(0), MaxRunners::Limited(1));
        assert_eq!(MaxRunners::from_configured(-1), MaxRunners::Unbounded);
        assert_eq!(MaxRunners::from_configured(7), MaxRunners::Limited(7));
        assert_eq!(MaxRunners::default(), MaxRunners::Limited(4));
    }

    #[test]
    fn admission_respects_ceiling() {
        let max = MaxRunners::Limited(2);
        assert!(max.admits(1));
        assert!(!max.admits(2));
        assert!(!max.admits(3));
        assert!(MaxRunners::Unbounded.admits(usize::MAX - 1));
    }

    #[test]
    fn debug_redacts_token() {
        let mut cfg = RunnerManagerConfig::new("img", LabelSet::new(["linux"]));
        cfg.access_token = "ghp_secret".into();
        assert!(!format!("{cfg:?}").contains("ghp_secret"));
    }
}
