//! Webhook ingestion surface.
//!
//! Accepts workflow job webhooks over HTTP and parks them on the shared
//! queue for the queue monitor; also serves liveness and `/metrics`.
mod error;
pub use error::ApiError;

mod http;
pub use http::HttpApi;
