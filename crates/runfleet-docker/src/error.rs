use bollard::errors::Error as BollardError;
use runfleet_core::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("cannot connect to docker socket '{path}': {reason}")]
    Connect { path: String, reason: String },

    #[error("docker api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("image pull failed: {0}")]
    Pull(String),

    #[error("invalid response: {0}")]
    Invalid(String),

    #[error("docker request timed out")]
    Timeout,

    #[error("docker transport error: {0}")]
    Transport(String),
}

impl From<BollardError> for DockerError {
    fn from(e: BollardError) -> Self {
        match e {
            BollardError::DockerResponseServerError {
                status_code: 404,
                message,
            } => DockerError::NotFound(message),
            BollardError::DockerResponseServerError {
                status_code,
                message,
            } => DockerError::Api {
                status: status_code,
                message,
            },
            BollardError::DockerStreamError { error } => DockerError::Pull(error),
            BollardError::RequestTimeoutError => DockerError::Timeout,
            other => DockerError::Transport(other.to_string()),
        }
    }
}

impl From<DockerError> for RuntimeError {
    fn from(e: DockerError) -> Self {
        match e {
            DockerError::Api { status, message } => RuntimeError::Api { status, message },
            DockerError::NotFound(what) => RuntimeError::NotFound(what),
            DockerError::Invalid(msg) => RuntimeError::Decode(msg),
            DockerError::Timeout => RuntimeError::Timeout,
            other => RuntimeError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_status_codes_are_classified() {
        let e: DockerError = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".into(),
        }
        .into();
        assert!(matches!(e, DockerError::NotFound(ref m) if m.contains("abc")));

        let e: DockerError = BollardError::DockerResponseServerError {
            status_code: 409,
            message: "name in use".into(),
        }
        .into();
        assert!(matches!(e, DockerError::Api { status: 409, .. }));

        let e: DockerError = BollardError::DockerStreamError {
            error: "manifest unknown".into(),
        }
        .into();
        assert!(matches!(e, DockerError::Pull(ref m) if m == "manifest unknown"));
    }

    #[test]
    fn maps_to_runtime_error() {
        let e: RuntimeError = DockerError::NotFound("abc".into()).into();
        assert!(matches!(e, RuntimeError::NotFound(ref id) if id == "abc"));

        let e: RuntimeError = DockerError::Timeout.into();
        assert!(matches!(e, RuntimeError::Timeout));

        let e: RuntimeError = DockerError::Connect {
            path: "/var/run/docker.sock".into(),
            reason: "permission denied".into(),
        }
        .into();
        assert!(matches!(e, RuntimeError::Transport(ref m) if m.contains("permission denied")));
    }
}
