//! runfleetd, the runner autoscaler daemon.
//!
//! Wires the configured surfaces into one process:
//! - webhook ingestion (HTTP) feeding the job queue
//! - queue monitor turning job events into runner containers
//! - runner guard stopping aged runners and retrying stuck starts
//!
//! # Usage
//!
//! ```text
//! runfleetd --config /etc/runfleet/runfleet.toml --mode both
//! ```
mod cli;
mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use taskvisor::Subscribe;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use runfleet_api::HttpApi;
use runfleet_core::{
    ContainerRuntime, IMAGE_CHECK_DEBOUNCE, ImageFreshnessGate, ImagePolicy, ImagePuller,
    InMemoryQueue, LabelMatcher, MetricsHandle, QueueMonitor, QueueProvider, RepositoryFilter,
    RunnerManager, RunnerManagerConfig, WorkflowProcessor, queue_monitor_task, runner_guard_task,
    supervise,
};
use runfleet_docker::{DockerClient, DockerConfig};
use runfleet_redis::RedisQueue;
use runfleet_observe::{LoggerTimeZone, SupervisorLog, init_local_offset, init_logger};
use runfleet_prometheus::PrometheusMetrics;

use crate::cli::Cli;
use crate::config::{AppConfig, QueueBackend};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) configuration
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    cfg.override_with(cli.mode, cli.log_level.as_deref())?;
    cfg.validate()?;

    // 2) logger; the local offset must be captured while single-threaded
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    init_logger(&cfg.logger)?;
    info!(mode = %cfg.mode, "configuration loaded");

    // 3) runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    rt.block_on(run(cfg))
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let metrics = PrometheusMetrics::new().context("failed to register metrics")?;
    let metrics_handle: MetricsHandle = Arc::new(metrics.clone());

    let queue: Arc<dyn QueueProvider> = match cfg.queue.provider {
        QueueBackend::Memory => Arc::new(InMemoryQueue::with_visibility_timeout(
            cfg.queue.visibility_timeout(),
        )),
        QueueBackend::Redis => Arc::new(RedisQueue::new(&cfg.queue.redis_config())?),
    };
    queue
        .initialize()
        .await
        .with_context(|| format!("failed to initialize {} queue", cfg.queue.provider))?;
    info!(provider = %cfg.queue.provider, "job queue ready");

    let shutdown = CancellationToken::new();

    let server = if cfg.mode.serves_http() {
        let mut api = HttpApi::new(queue.clone());
        if cfg.http.metrics {
            api = api.with_metrics(metrics.clone());
        }
        let listener = TcpListener::bind(cfg.http.listen)
            .await
            .with_context(|| format!("failed to bind {}", cfg.http.listen))?;
        info!(addr = %cfg.http.listen, "http server starting");

        let stop = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, api.router())
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        }))
    } else {
        None
    };

    if cfg.mode.monitors_queue() {
        let docker = Arc::new(DockerClient::new(&DockerConfig {
            socket_path: cfg.runner.docker_socket.clone().into(),
            request_timeout: cfg.runner.request_timeout(),
        })?);
        let runtime: Arc<dyn ContainerRuntime> = docker.clone();
        let puller: Arc<dyn ImagePuller> = docker;

        let gate = ImageFreshnessGate::new(
            puller,
            ImagePolicy {
                auto_check_for_updates: cfg.runner.auto_check_for_image_updates,
                registry_auth: cfg.runner.registry_auth(),
                debounce: IMAGE_CHECK_DEBOUNCE,
            },
        );

        let labels = cfg.label_set();
        let mut runner_cfg = RunnerManagerConfig::new(cfg.runner.image.clone(), labels.clone());
        runner_cfg.max_runners = cfg.runner.max_runners();
        runner_cfg.access_token = cfg.github_token.clone();
        runner_cfg.coordinator_hostname = cfg.hostname().to_string();
        runner_cfg.tool_cache_volume = cfg.runner.tool_cache_volume.clone();
        runner_cfg.control_socket = cfg.runner.docker_socket.clone();
        runner_cfg.github_url = cfg.runner.github_url.clone();
        info!(
            image = %runner_cfg.image,
            max_runners = %runner_cfg.max_runners,
            labels = %labels,
            "runner manager configured"
        );

        let manager = Arc::new(
            RunnerManager::new(runtime, gate, runner_cfg).with_metrics(metrics_handle.clone()),
        );
        let processor = WorkflowProcessor::new(
            manager.clone(),
            LabelMatcher::new(labels),
            RepositoryFilter::new(&cfg.repository_filter.to_policy()),
        )
        .with_metrics(metrics_handle.clone());
        let monitor = Arc::new(
            QueueMonitor::new(queue.clone(), Arc::new(processor))
                .with_config(cfg.queue.monitor_config())
                .with_metrics(metrics_handle),
        );

        let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(SupervisorLog)];
        let tasks = vec![queue_monitor_task(monitor), runner_guard_task(manager)];
        let supervised = supervise(subscribers, tasks).await;
        shutdown.cancel();
        supervised?;
    } else {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        info!("shutdown signal received");
        shutdown.cancel();
    }

    if let Some(server) = server {
        server.await??;
    }

    info!("runfleetd stopped");
    Ok(())
}
