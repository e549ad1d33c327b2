use thiserror::Error;

use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("fleet at capacity: {active} active, limit {max}")]
    AtCapacity { active: usize, max: usize },

    #[error("runner image '{0}' is not available")]
    ImageUnavailable(String),

    #[error("runner '{name}' failed to start after {attempts} attempts")]
    StartFailed { name: String, attempts: u32 },

    #[error("runner '{name}' was not ready before the deadline")]
    Timeout { name: String },

    #[error("operation canceled")]
    Canceled,

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl RunnerError {
    /// Short category used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            RunnerError::AtCapacity { .. } => "at_capacity",
            RunnerError::ImageUnavailable(_) => "image_unavailable",
            RunnerError::StartFailed { .. } => "start_failed",
            RunnerError::Timeout { .. } => "timeout",
            RunnerError::Canceled => "canceled",
            RunnerError::Runtime(_) => "runtime",
        }
    }
}
