//! Job events decoded from queue messages.
//!
//! Wire format: base64-encoded UTF-8 JSON with the fields `action`, `workflow_job`
//! (`name`, `labels`, `run_id`) and `repository` (`full_name`, `name`). Unknown fields are ignored.
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

const ACTION_QUEUED: &str = "queued";
const ACTION_COMPLETED: &str = "completed";

/// Job section of a workflow-job event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub name: String,
    /// Labels the job requires from its runner, as sent by the CI platform.
    #[serde(default)]
    pub labels: Vec<String>,
    pub run_id: i64,
}

/// Repository section of a workflow-job event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    #[serde(default)]
    pub name: String,
}

/// Job and repository carried by actionable events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job: WorkflowJob,
    pub repository: Repository,
}

/// One decoded queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A job is waiting for a runner.
    Queued(JobContext),
    /// A job finished on some runner.
    Completed(JobContext),
    /// Any other (or absent) action; nothing to do.
    Other { action: Option<String> },
}

#[derive(Deserialize)]
struct WireEvent {
    action: Option<String>,
    workflow_job: Option<WorkflowJob>,
    repository: Option<Repository>,
}

impl JobEvent {
    /// Decode a raw queue message body (base64 of JSON).
    pub fn decode(content: &str) -> ModelResult<Self> {
        let bytes = STANDARD
            .decode(content.trim())
            .map_err(|e| ModelError::Base64(e.to_string()))?;
        let json = std::str::from_utf8(&bytes).map_err(|_| ModelError::Utf8)?;
        Self::from_json(json)
    }

    /// Decode the JSON payload of a job event.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let wire: WireEvent =
            serde_json::from_str(json).map_err(|e| ModelError::Json(e.to_string()))?;

        let action = match wire.action.as_deref() {
            Some(ACTION_QUEUED) => ACTION_QUEUED,
            Some(ACTION_COMPLETED) => ACTION_COMPLETED,
            _ => return Ok(JobEvent::Other { action: wire.action }),
        };

        let job = wire.workflow_job.ok_or(ModelError::MissingField {
            action,
            field: "workflow_job",
        })?;
        let repository = wire.repository.ok_or(ModelError::MissingField {
            action,
            field: "repository",
        })?;
        let ctx = JobContext { job, repository };

        Ok(if action == ACTION_QUEUED {
            JobEvent::Queued(ctx)
        } else {
            JobEvent::Completed(ctx)
        })
    }

    /// Action name as it appeared on the wire (`"none"` when absent).
    pub fn action(&self) -> &str {
        match self {
            JobEvent::Queued(_) => ACTION_QUEUED,
            JobEvent::Completed(_) => ACTION_COMPLETED,
            JobEvent::Other { action } => action.as_deref().unwrap_or("none"),
        }
    }

    /// Job and repository, if the action carries them.
    pub fn context(&self) -> Option<&JobContext> {
        match self {
            JobEvent::Queued(ctx) | JobEvent::Completed(ctx) => Some(ctx),
            JobEvent::Other { .. } => None,
        }
    }
}

/// Encode a JSON payload into the queue message body format.
pub fn encode_content(json: &str) -> String {
    STANDARD.encode(json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUED: &str = r#"{
        "action": "queued",
        "workflow_job": {"name": "build", "labels": ["self-hosted", "linux"], "run_id": 42, "status": "queued"},
        "repository": {"full_name": "org/repo", "name": "repo", "private": true},
        "sender": {"login": "someone"}
    }"#;

    #[test]
    fn decodes_queued_event_and_ignores_unknown_fields() {
        let event = JobEvent::decode(&encode_content(QUEUED)).unwrap();

        let JobEvent::Queued(ctx) = event else {
            panic!("expected queued event, got {event:?}");
        };
        assert_eq!(ctx.job.name, "build");
        assert_eq!(ctx.job.labels, vec!["self-hosted", "linux"]);
        assert_eq!(ctx.job.run_id, 42);
        assert_eq!(ctx.repository.full_name, "org/repo");
        assert_eq!(ctx.repository.name, "repo");
    }

    #[test]
    fn completed_event_is_recognized() {
        let json = QUEUED.replace("\"action\": \"queued\"", "\"action\": \"completed\"");
        let event = JobEvent::from_json(&json).unwrap();

        assert_eq!(event.action(), "completed");
        assert!(matches!(event, JobEvent::Completed(_)));
    }

    #[test]
    fn unknown_or_absent_action_does_not_require_payload() {
        let event = JobEvent::from_json(r#"{"action": "in_progress"}"#).unwrap();
        assert_eq!(event, JobEvent::Other { action: Some("in_progress".into()) });
        assert!(event.context().is_none());

        let event = JobEvent::from_json("{}").unwrap();
        assert_eq!(event.action(), "none");
    }

    #[test]
    fn queued_without_job_is_an_error() {
        let err = JobEvent::from_json(r#"{"action": "queued", "repository": {"full_name": "a/b"}}"#)
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::MissingField { field: "workflow_job", .. }
        ));
    }

    #[test]
    fn completed_without_repository_is_an_error() {
        let err = JobEvent::from_json(
            r#"{"action": "completed", "workflow_job": {"name": "x", "run_id": 1}}"#,
        )
        .unwrap_err();

        assert!(matches!(err, ModelError::MissingField { field: "repository", .. }));
    }

    #[test]
    fn non_base64_and_non_json_are_rejected() {
        assert!(matches!(
            JobEvent::decode("not base64 !!!"),
            Err(ModelError::Base64(_))
        ));
        assert!(matches!(
            JobEvent::decode(&encode_content("definitely not json")),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn missing_labels_default_to_empty() {
        let event = JobEvent::from_json(
            r#"{"action":"queued","workflow_job":{"name":"x","run_id":7},"repository":{"full_name":"a/b"}}"#,
        )
        .unwrap();

        let ctx = event.context().unwrap();
        assert!(ctx.job.labels.is_empty());
        assert_eq!(ctx.repository.name, "");
    }
}
