//! Error types for A2A task operations

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::task::TaskState;

/// Main error type for A2A task operations
///
/// Server-side kinds are returned synchronously by the task manager and never mutate task
/// state. [`A2AError::Remote`] wraps client-side transport and protocol failures.
#[derive(Debug, Error)]
pub enum A2AError {
    /// No task is registered under the given ID
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// The requested state change is not an edge of the task state graph
    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    /// The task is in a terminal state and accepts no further changes
    #[error("Task {task_id} is terminal ({state})")]
    TaskTerminal { task_id: String, state: TaskState },

    /// The agent does not declare this task kind
    #[error("Unsupported task kind: {kind}")]
    UnsupportedTaskKind { kind: String },

    /// The artifact type is not recognized or not declared by the agent
    #[error("Invalid artifact type: {kind}")]
    InvalidArtifactType { kind: String },

    /// The artifact content does not match the shape its type requires
    #[error("Invalid artifact content: {0}")]
    InvalidArtifactContent(String),

    /// The agent card is malformed
    #[error("Invalid agent card: {0}")]
    InvalidAgentCard(String),

    /// A caller-supplied task ID is already registered
    #[error("Task already exists: {task_id}")]
    TaskAlreadyExists { task_id: String },

    /// The task manager has been shut down
    #[error("Task manager is shut down")]
    ShutDown,

    /// Request rejected before it was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport or protocol failure talking to a remote agent
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised while talking to a remote agent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network, connection or stream failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with something that does not follow the protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The request did not complete in time
    #[error("request timeout")]
    Timeout,

    /// The remote asked us to slow down
    #[error("rate limit exceeded")]
    RateLimited,

    /// Non-success status without a recognized error body
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl RemoteError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) | RemoteError::Timeout | RemoteError::RateLimited => true,
            RemoteError::Status { status, .. } => *status >= 500,
            RemoteError::Protocol(_) => false,
        }
    }
}

impl A2AError {
    /// Whether the failure is a transient remote failure worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, A2AError::Remote(remote) if remote.is_transient())
    }

    /// Stable error code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            A2AError::TaskNotFound { .. } => "TASK_NOT_FOUND",
            A2AError::InvalidTransition { .. } => "INVALID_TRANSITION",
            A2AError::TaskTerminal { .. } => "TASK_TERMINAL",
            A2AError::UnsupportedTaskKind { .. } => "UNSUPPORTED_TASK_KIND",
            A2AError::InvalidArtifactType { .. } => "INVALID_ARTIFACT_TYPE",
            A2AError::InvalidArtifactContent(_) => "INVALID_ARTIFACT_CONTENT",
            A2AError::InvalidAgentCard(_) => "INVALID_AGENT_CARD",
            A2AError::TaskAlreadyExists { .. } => "TASK_ALREADY_EXISTS",
            A2AError::ShutDown => "SHUT_DOWN",
            A2AError::Validation(_) => "VALIDATION",
            A2AError::Remote(_) => "REMOTE",
            A2AError::Serialization(_) => "SERIALIZATION",
        }
    }

    /// HTTP-equivalent status for this error
    pub fn status(&self) -> u16 {
        match self {
            A2AError::TaskNotFound { .. } => 404,
            A2AError::InvalidTransition { .. }
            | A2AError::TaskTerminal { .. }
            | A2AError::TaskAlreadyExists { .. } => 409,
            A2AError::UnsupportedTaskKind { .. }
            | A2AError::InvalidArtifactType { .. }
            | A2AError::InvalidArtifactContent(_) => 422,
            A2AError::Validation(_) | A2AError::Serialization(_) => 400,
            A2AError::ShutDown => 503,
            A2AError::InvalidAgentCard(_) | A2AError::Remote(_) => 500,
        }
    }

    /// Convert into the wire error body
    pub fn to_body(&self) -> ErrorBody {
        let (task_id, details) = match self {
            A2AError::TaskNotFound { task_id } | A2AError::TaskAlreadyExists { task_id } => {
                (Some(task_id.clone()), None)
            }
            A2AError::InvalidTransition { task_id, from, to } => {
                (Some(task_id.clone()), Some(json!({ "from": from, "to": to })))
            }
            A2AError::TaskTerminal { task_id, state } => {
                (Some(task_id.clone()), Some(json!({ "state": state })))
            }
            A2AError::UnsupportedTaskKind { kind } | A2AError::InvalidArtifactType { kind } => {
                (None, Some(json!({ "kind": kind })))
            }
            _ => (None, None),
        };

        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            task_id,
            details,
        }
    }
}

/// Error body exchanged on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    /// Rebuild the error kind the remote raised
    ///
    /// Codes that cannot be reconstructed map to [`RemoteError::Status`] so no failure is lost.
    pub fn into_error(self, status: u16) -> A2AError {
        let task_id = self.task_id.clone().unwrap_or_default();
        let detail = |key: &str| self.details.as_ref().and_then(|d| d.get(key)).cloned();
        let state = |key: &str| detail(key).and_then(|v| serde_json::from_value(v).ok());
        let kind = || {
            detail("kind")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        };

        let rebuilt = match self.code.as_str() {
            "TASK_NOT_FOUND" => Some(A2AError::TaskNotFound { task_id }),
            "TASK_ALREADY_EXISTS" => Some(A2AError::TaskAlreadyExists { task_id }),
            "INVALID_TRANSITION" => match (state("from"), state("to")) {
                (Some(from), Some(to)) => Some(A2AError::InvalidTransition { task_id, from, to }),
                _ => None,
            },
            "TASK_TERMINAL" => {
                state("state").map(|state| A2AError::TaskTerminal { task_id, state })
            }
            "UNSUPPORTED_TASK_KIND" => Some(A2AError::UnsupportedTaskKind { kind: kind() }),
            "INVALID_ARTIFACT_TYPE" => Some(A2AError::InvalidArtifactType { kind: kind() }),
            "INVALID_ARTIFACT_CONTENT" => {
                Some(A2AError::InvalidArtifactContent(self.message.clone()))
            }
            "INVALID_AGENT_CARD" => Some(A2AError::InvalidAgentCard(self.message.clone())),
            "SHUT_DOWN" => Some(A2AError::ShutDown),
            "VALIDATION" => Some(A2AError::Validation(self.message.clone())),
            _ => None,
        };

        rebuilt.unwrap_or_else(|| match status {
            429 => RemoteError::RateLimited.into(),
            _ => RemoteError::Status {
                status,
                message: self.message,
            }
            .into(),
        })
    }
}

/// Result type alias for A2A operations
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    /// Rebuild the error carried by a non-success response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if let Ok(error) = serde_json::from_slice::<ErrorBody>(body) {
            return error.into_error(status);
        }
        match status {
            429 => RemoteError::RateLimited.into(),
            408 | 504 => RemoteError::Timeout.into(),
            _ => RemoteError::Status {
                status,
                message: String::from_utf8_lossy(body).into_owned(),
            }
            .into(),
        }
    }
}

impl From<reqwest::Error> for A2AError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout.into()
        } else if err.is_connect() {
            RemoteError::Transport(format!("Connection error: {}", err)).into()
        } else if err.is_decode() {
            RemoteError::Protocol(err.to_string()).into()
        } else {
            RemoteError::Transport(err.to_string()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(A2AError::from(RemoteError::Timeout).is_transient());
        assert!(A2AError::from(RemoteError::Transport("reset".into())).is_transient());
        assert!(A2AError::from(RemoteError::Status {
            status: 503,
            message: "busy".into()
        })
        .is_transient());
        assert!(!A2AError::from(RemoteError::Status {
            status: 400,
            message: "bad".into()
        })
        .is_transient());
        assert!(!A2AError::TaskNotFound {
            task_id: "t".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_body_preserves_kind() {
        let err = A2AError::InvalidTransition {
            task_id: "task-1".into(),
            from: TaskState::Completed,
            to: TaskState::Working,
        };
        let status = err.status();
        let body = err.to_body();
        assert_eq!(status, 409);
        assert_eq!(body.code, "INVALID_TRANSITION");

        match body.into_error(status) {
            A2AError::InvalidTransition { task_id, from, to } => {
                assert_eq!(task_id, "task-1");
                assert_eq!(from, TaskState::Completed);
                assert_eq!(to, TaskState::Working);
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_error_body_unsupported_kind() {
        let body = A2AError::UnsupportedTaskKind {
            kind: "translate".into(),
        }
        .to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "UNSUPPORTED_TASK_KIND");
        assert!(json.get("taskId").is_none());

        assert!(matches!(
            body.into_error(422),
            A2AError::UnsupportedTaskKind { kind } if kind == "translate"
        ));
    }

    #[test]
    fn test_from_response_without_body() {
        assert!(matches!(
            A2AError::from_response(429, b""),
            A2AError::Remote(RemoteError::RateLimited)
        ));
        let err = A2AError::from_response(502, b"bad gateway");
        assert!(err.is_transient());
        let body = br#"{"code":"TASK_NOT_FOUND","message":"gone","taskId":"t"}"#;
        assert!(matches!(
            A2AError::from_response(404, body),
            A2AError::TaskNotFound { task_id } if task_id == "t"
        ));
    }

    #[test]
    fn test_unknown_code_becomes_remote_status() {
        let body = ErrorBody {
            code: "SOMETHING_ELSE".into(),
            message: "boom".into(),
            task_id: None,
            details: None,
        };
        match body.into_error(502) {
            A2AError::Remote(RemoteError::Status { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected remote status, got {other:?}"),
        }
    }
}
