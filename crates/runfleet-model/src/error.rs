use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("message content is not valid base64: {0}")]
    Base64(String),

    #[error("message content is not valid utf-8")]
    Utf8,

    #[error("message content is not a valid job event: {0}")]
    Json(String),

    #[error("missing field '{field}' for action '{action}'")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
