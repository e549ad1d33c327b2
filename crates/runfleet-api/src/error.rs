use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use runfleet_core::QueueError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to enqueue job: {0}")]
    Queue(#[from] QueueError),

    #[error("failed to encode job payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("metrics unavailable: {0}")]
    Metrics(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = ErrorBody {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
