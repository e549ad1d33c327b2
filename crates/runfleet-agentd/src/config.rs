//! `runfleetd` configuration file.
//!
//! Every section is optional; absent keys take the defaults below. Secrets may
//! come from the environment instead of the file.
use std::{fmt, net::SocketAddr, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use runfleet_core::{MaxRunners, MonitorConfig, RegistryAuth};
use runfleet_model::{FilterPolicy, LabelSet, ListRule};
use runfleet_observe::{LoggerConfig, LoggerLevel};
use runfleet_redis::{DEFAULT_QUEUE_NAME, RedisQueueConfig};

pub const ENV_GITHUB_TOKEN: &str = "RUNFLEET_GITHUB_TOKEN";
pub const ENV_REGISTRY_TOKEN: &str = "RUNFLEET_REGISTRY_TOKEN";
pub const ENV_REDIS_URL: &str = "RUNFLEET_REDIS_URL";
const ENV_HOSTNAME: &str = "HOSTNAME";
const FALLBACK_HOSTNAME: &str = "runfleet";

pub const DEFAULT_IMAGE: &str = "myoung34/github-runner:latest";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Which surfaces this process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OperationMode {
    /// HTTP ingestion only.
    Webhook,
    /// Consume loop and runner guard only.
    QueueMonitor,
    #[default]
    Both,
}

impl OperationMode {
    pub fn serves_http(&self) -> bool {
        matches!(self, OperationMode::Webhook | OperationMode::Both)
    }

    pub fn monitors_queue(&self) -> bool {
        matches!(self, OperationMode::QueueMonitor | OperationMode::Both)
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationMode::Webhook => "webhook",
            OperationMode::QueueMonitor => "queue-monitor",
            OperationMode::Both => "both",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryFilterConfig {
    pub allowlist_prefix: String,
    pub allowlist: Vec<String>,
    pub allowlist_exact_match: bool,
    pub denylist_prefix: String,
    pub denylist: Vec<String>,
    pub denylist_exact_match: bool,
}

impl Default for RepositoryFilterConfig {
    fn default() -> Self {
        Self {
            allowlist_prefix: String::new(),
            allowlist: Vec::new(),
            allowlist_exact_match: true,
            denylist_prefix: String::new(),
            denylist: Vec::new(),
            denylist_exact_match: false,
        }
    }
}

impl RepositoryFilterConfig {
    pub fn to_policy(&self) -> FilterPolicy {
        FilterPolicy::new(
            ListRule::allow()
                .with_prefix(self.allowlist_prefix.as_str())
                .with_entries(self.allowlist.iter().map(String::as_str))
                .with_exact_match(self.allowlist_exact_match),
            ListRule::deny()
                .with_prefix(self.denylist_prefix.as_str())
                .with_entries(self.denylist.iter().map(String::as_str))
                .with_exact_match(self.denylist_exact_match),
        )
        .normalized()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub image: String,
    /// `0` means one runner, negative means no limit.
    pub max_runners: i64,
    pub registry_token: String,
    pub registry_username: Option<String>,
    pub auto_check_for_image_updates: bool,
    pub tool_cache_volume: String,
    pub docker_socket: String,
    pub github_url: String,
    pub request_timeout_secs: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            max_runners: 4,
            registry_token: String::new(),
            registry_username: None,
            auto_check_for_image_updates: true,
            tool_cache_volume: runfleet_core::runner::DEFAULT_TOOL_CACHE_VOLUME.to_string(),
            docker_socket: runfleet_core::runner::DEFAULT_CONTROL_SOCKET.to_string(),
            github_url: runfleet_core::runner::DEFAULT_GITHUB_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl RunnerSection {
    pub fn max_runners(&self) -> MaxRunners {
        MaxRunners::from_configured(self.max_runners)
    }

    pub fn registry_auth(&self) -> RegistryAuth {
        RegistryAuth {
            username: self.registry_username.clone(),
            password: self.registry_token.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where jobs are queued between ingestion and consumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueBackend {
    /// Process-local; only meaningful when one process runs both surfaces.
    #[default]
    Memory,
    /// Shared Redis server.
    Redis,
}

impl fmt::Display for QueueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueueBackend::Memory => "memory",
            QueueBackend::Redis => "redis",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub provider: QueueBackend,
    pub redis_url: String,
    /// Key prefix of the shared queue.
    pub name: String,
    pub visibility_timeout_secs: u64,
    pub idle_delay_secs: u64,
    pub error_backoff_secs: u64,
    pub poison_delay_secs: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            provider: QueueBackend::Memory,
            redis_url: String::new(),
            name: DEFAULT_QUEUE_NAME.to_string(),
            visibility_timeout_secs: 30,
            idle_delay_secs: 10,
            error_backoff_secs: 10,
            poison_delay_secs: 10,
        }
    }
}

impl QueueSection {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn redis_config(&self) -> RedisQueueConfig {
        RedisQueueConfig {
            url: self.redis_url.trim().to_string(),
            name: self.name.trim().to_string(),
            visibility_timeout: self.visibility_timeout(),
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poison_delay: Duration::from_secs(self.poison_delay_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
            idle_delay: Duration::from_secs(self.idle_delay_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub listen: SocketAddr,
    /// Mount `GET /metrics`.
    pub metrics: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            metrics: true,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub mode: OperationMode,
    pub github_token: String,
    /// Empty means the machine host name.
    pub coordinator_hostname: String,
    pub labels: Vec<String>,
    pub repository_filter: RepositoryFilterConfig,
    pub runner: RunnerSection,
    pub queue: QueueSection,
    pub http: HttpSection,
    pub logger: LoggerConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runner = self.runner.clone();
        if !runner.registry_token.is_empty() {
            runner.registry_token = "<redacted>".to_string();
        }
        let mut queue = self.queue.clone();
        if queue.redis_url.contains('@') {
            queue.redis_url = "<redacted>".to_string();
        }
        f.debug_struct("AppConfig")
            .field("mode", &self.mode)
            .field("github_token", &"<redacted>")
            .field("coordinator_hostname", &self.coordinator_hostname)
            .field("labels", &self.labels)
            .field("repository_filter", &self.repository_filter)
            .field("runner", &runner)
            .field("queue", &queue)
            .field("http", &self.http)
            .field("logger", &self.logger)
            .finish()
    }
}

impl AppConfig {
    /// Read `path` (or take the defaults), apply process environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.display().to_string(),
                        source,
                    })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill secrets and the host name from `lookup`; non-empty values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_GITHUB_TOKEN) {
            self.github_token = token;
        }
        if let Some(token) = non_empty(ENV_REGISTRY_TOKEN) {
            self.runner.registry_token = token;
        }
        if let Some(url) = non_empty(ENV_REDIS_URL) {
            self.queue.redis_url = url;
        }
        if self.coordinator_hostname.trim().is_empty() {
            self.coordinator_hostname =
                non_empty(ENV_HOSTNAME).unwrap_or_else(|| FALLBACK_HOSTNAME.to_string());
        }
    }

    /// Apply command line overrides.
    pub fn override_with(
        &mut self,
        mode: Option<OperationMode>,
        log_level: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(level) = log_level {
            let level = LoggerLevel::new(level)
                .map_err(|e| ConfigError::Invalid(vec![e.to_string()]))?;
            self.logger.level = level;
        }
        Ok(())
    }

    /// Reject configurations the daemon cannot run with, listing every failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut failures = Vec::new();

        if self.mode.monitors_queue() && self.github_token.trim().is_empty() {
            failures.push(format!(
                "github_token is required in {} mode (or set {ENV_GITHUB_TOKEN})",
                self.mode
            ));
        }
        if self.runner.image.trim().is_empty() {
            failures.push("runner.image must not be empty".to_string());
        }
        if self.runner.request_timeout_secs == 0 {
            failures.push("runner.request_timeout_secs must be positive".to_string());
        }
        match self.queue.provider {
            QueueBackend::Memory if self.mode != OperationMode::Both => failures.push(format!(
                "queue.provider = \"memory\" cannot connect separate processes; {} mode needs \"redis\"",
                self.mode
            )),
            QueueBackend::Redis if self.queue.redis_url.trim().is_empty() => failures.push(
                format!("queue.redis_url is required with the redis provider (or set {ENV_REDIS_URL})"),
            ),
            QueueBackend::Redis if self.queue.name.trim().is_empty() => {
                failures.push("queue.name must not be empty".to_string())
            }
            _ => {}
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(failures))
        }
    }

    pub fn label_set(&self) -> LabelSet {
        LabelSet::new(&self.labels)
    }

    pub fn hostname(&self) -> &str {
        self.coordinator_hostname.trim()
    }
}
