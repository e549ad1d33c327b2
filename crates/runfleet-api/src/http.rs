use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use runfleet_core::QueueProvider;
use runfleet_model::encode_content;
use runfleet_prometheus::PrometheusMetrics;

use crate::error::ApiError;

/// HTTP API service builder.
pub struct HttpApi {
    queue: Arc<dyn QueueProvider>,
    metrics: Option<PrometheusMetrics>,
}

#[derive(Clone)]
struct AppState {
    queue: Arc<dyn QueueProvider>,
    metrics: Option<PrometheusMetrics>,
}

impl HttpApi {
    pub fn new(queue: Arc<dyn QueueProvider>) -> Self {
        Self {
            queue,
            metrics: None,
        }
    }

    /// Serve `GET /metrics` from this backend.
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /                       - Liveness
    /// - GET /workflow/ping          - Health check
    /// - POST /workflow/enqueue-job  - Queue a webhook payload
    /// - GET /metrics                - Prometheus exposition (when configured)
    pub fn router(self) -> Router {
        let state = AppState {
            queue: self.queue,
            metrics: self.metrics,
        };

        let router = Router::new()
            .route("/", get(alive))
            .route("/workflow/ping", get(ping))
            .route("/workflow/enqueue-job", post(enqueue_job));

        let router = if state.metrics.is_some() {
            router.route("/metrics", get(metrics))
        } else {
            router
        };

        router.with_state(state)
    }
}

#[derive(Debug, Serialize)]
struct PingResponse {
    message: &'static str,
}

/// GET /
async fn alive() -> &'static str {
    "alive"
}

/// GET /workflow/ping
async fn ping() -> Json<PingResponse> {
    Json(PingResponse { message: "Pong" })
}

/// POST /workflow/enqueue-job
#[instrument(skip_all)]
async fn enqueue_job(
    State(state): State<AppState>,
    Json(job): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let text = serde_json::to_string(&job)?;
    let content = encode_content(&text);

    state.queue.initialize().await?;
    state.queue.send(&content).await?;
    debug!(bytes = text.len(), "job enqueued");

    Ok(axum::http::StatusCode::OK)
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let Some(metrics) = state.metrics else {
        return Err(ApiError::Metrics("no metrics backend".into()));
    };
    let body = metrics
        .encode_text()
        .map_err(|e| ApiError::Metrics(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body))
}
