use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is not initialized")]
    NotInitialized,

    #[error("message '{0}' not found")]
    NotFound(String),

    #[error("pop receipt mismatch for message '{0}'")]
    ReceiptMismatch(String),

    #[error("queue transport error: {0}")]
    Transport(String),
}
