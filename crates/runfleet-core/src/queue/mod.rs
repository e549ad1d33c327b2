//! Abstract queue contract consumed by the queue monitor and the webhook surface.
mod error;
pub use error::QueueError;

mod memory;
pub use memory::{DEFAULT_VISIBILITY_TIMEOUT, InMemoryQueue};

use async_trait::async_trait;
use time::OffsetDateTime;

/// One message as handed out by a queue provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    /// Token proving the current receive; required to delete.
    pub pop_receipt: String,
    /// Opaque payload, usually base64-encoded JSON.
    pub content: String,
    pub inserted_at: Option<OffsetDateTime>,
    pub dequeue_count: u32,
}

/// Queue transport seam.
///
/// Implementations must be safe for concurrent use: the consume loop and the
/// ingestion surface share one instance.
#[async_trait]
pub trait QueueProvider: Send + Sync + 'static {
    /// Prepare the underlying transport (create the queue, open connections).
    async fn initialize(&self) -> Result<(), QueueError>;

    /// Take the next visible message, hiding it from other receivers until
    /// it is deleted or its visibility lapses.
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError>;

    /// Look at the next visible message without hiding it.
    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError>;

    async fn send(&self, content: &str) -> Result<(), QueueError>;

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError>;

    async fn approximate_count(&self) -> Result<usize, QueueError>;
}
