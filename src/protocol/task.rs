//! A2A task types and the task state machine

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::artifact::Artifact;

/// A task in the A2A protocol
///
/// Tasks represent long-running work submitted to an agent. The server-side task manager owns
/// the authoritative copy; everything else holds snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Task kind, one of the capabilities declared by the agent card
    pub kind: String,

    /// Current lifecycle state
    pub state: TaskState,

    /// Input supplied at creation
    pub input: Value,

    /// Further input supplied while the task was waiting for it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Value>,

    /// Session/context metadata supplied at creation
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Ordered record of every state change
    #[serde(default)]
    pub history: Vec<StateTransition>,

    /// Artifacts produced so far, in addition order
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Error information (present if task failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task in the `submitted` state
    pub fn new(id: impl Into<String>, kind: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            state: TaskState::Submitted,
            input,
            inputs: Vec::new(),
            metadata: HashMap::new(),
            history: Vec::new(),
            artifacts: Vec::new(),
            error: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Attach creation metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the task requires input
    pub fn requires_input(&self) -> bool {
        self.state == TaskState::InputRequired
    }

    /// Record a state change
    ///
    /// Callers are responsible for checking the edge first; this only appends history.
    pub(crate) fn record_transition(
        &mut self,
        to: TaskState,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StateTransition {
        let transition = StateTransition {
            from: self.state,
            to,
            reason,
            timestamp: at,
        };
        self.state = to;
        self.history.push(transition.clone());
        self.updated_at = Some(at);
        transition
    }
}

/// Task state in the A2A protocol lifecycle
///
/// Lifecycle: submitted → working → {input-required → working, completed, failed, canceled,
/// rejected}. Every non-terminal state may also move to canceled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been received and is queued for processing
    Submitted,

    /// Task is currently being processed
    Working,

    /// Task requires additional input from the client
    InputRequired,

    /// Task completed successfully
    Completed,

    /// Task failed with an error
    Failed,

    /// Task was canceled
    Canceled,

    /// Task was rejected by the agent
    Rejected,
}

impl TaskState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
        )
    }

    /// Whether `self -> to` is an edge of the state graph
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        use TaskState::*;

        match (self, to) {
            (Submitted, Working) => true,
            (Working, InputRequired | Completed | Failed | Rejected) => true,
            (InputRequired, Working) => true,
            (from, Canceled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a task's state history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: TaskState,
    pub to: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Task-specific error with structured information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct TaskError {
    /// Error code (e.g., "INVALID_INPUT", "PROCESSING_FAILED")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error details as structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl TaskError {
    /// Create a new task error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the task error
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Request body for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub kind: String,

    #[serde(default)]
    pub input: Value,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Caller-chosen task ID; the server generates one when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Response from listing tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    /// List of tasks
    pub tasks: Vec<Task>,

    /// Total number of tasks matching the query
    pub total: usize,
}
