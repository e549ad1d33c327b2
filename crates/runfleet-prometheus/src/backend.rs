use std::sync::Arc;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use runfleet_core::{MessageOutcome, MetricsBackend};

const NAMESPACE: &str = "runfleet";

/// Prometheus metrics backend.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `action`: webhook action names (`queued`, `completed`, `in_progress`, ...)
/// - `reason`: runner error kinds (`at_capacity`, `image_unavailable`, `start_failed`, ...)
/// - `outcome`: `deleted`, `deferred`, `failed`
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_received: IntCounterVec,
    jobs_completed: IntCounter,
    runners_created: IntCounter,
    runner_failures: IntCounterVec,
    queue_messages: IntCounterVec,
    queue_depth: IntGauge,
    active_runners: IntGauge,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering into `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_received = IntCounterVec::new(
            Opts::new("jobs_received_total", "Decoded workflow job events").namespace(NAMESPACE),
            &["action"],
        )?;
        registry.register(Box::new(jobs_received.clone()))?;

        let jobs_completed = IntCounter::with_opts(
            Opts::new("jobs_completed_total", "Completed workflow job events")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        let runners_created = IntCounter::with_opts(
            Opts::new("runners_created_total", "Runner containers created and started")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(runners_created.clone()))?;

        let runner_failures = IntCounterVec::new(
            Opts::new("runner_failures_total", "Failed runner provisioning attempts")
                .namespace(NAMESPACE),
            &["reason"],
        )?;
        registry.register(Box::new(runner_failures.clone()))?;

        let queue_messages = IntCounterVec::new(
            Opts::new("queue_messages_total", "Dequeued messages by disposition")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(queue_messages.clone()))?;

        let queue_depth = IntGauge::with_opts(
            Opts::new("queue_depth", "Approximate number of queued messages").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(queue_depth.clone()))?;

        let active_runners = IntGauge::with_opts(
            Opts::new("active_runners", "Managed runner containers").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(active_runners.clone()))?;

        Ok(Self {
            jobs_received,
            jobs_completed,
            runners_created,
            runner_failures,
            queue_messages,
            queue_depth,
            active_runners,
            registry,
        })
    }

    /// Create a backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type matching [`PrometheusMetrics::encode_text`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_received(&self, action: &str) {
        self.jobs_received.with_label_values(&[action]).inc();
    }

    fn record_runner_created(&self) {
        self.runners_created.inc();
    }

    fn record_runner_failed(&self, reason: &str) {
        self.runner_failures.with_label_values(&[reason]).inc();
    }

    fn record_job_completed(&self) {
        self.jobs_completed.inc();
    }

    fn record_message(&self, outcome: MessageOutcome) {
        self.queue_messages
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    fn set_active_runners(&self, count: u64) {
        self.active_runners.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
