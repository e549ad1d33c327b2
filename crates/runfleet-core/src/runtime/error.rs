use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime transport error: {0}")]
    Transport(String),

    #[error("runtime api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid runtime response: {0}")]
    Decode(String),

    #[error("runtime call timed out")]
    Timeout,
}
