//! A2A protocol operations

use std::collections::HashMap;

use serde_json::Value;
use url::form_urlencoded;

use super::task::TaskState;

/// A2A protocol operations
///
/// Binding-independent description of every inbound call the task core accepts. Each
/// operation maps 1:1 onto a task manager or event stream operation.
#[derive(Debug, Clone)]
pub enum A2AOperation {
    /// Create a task
    CreateTask {
        /// Task kind, must be declared by the agent card
        kind: String,

        /// Initial input
        input: Value,

        /// Session/context metadata
        metadata: HashMap<String, Value>,

        /// Optional caller-chosen task ID
        task_id: Option<String>,
    },

    /// Get a task by ID
    GetTask {
        /// The task ID to retrieve
        task_id: String,
    },

    /// List tasks with optional filtering
    ListTasks {
        /// Filter by task state
        state: Option<TaskState>,

        /// Maximum number of tasks to return
        limit: Option<u32>,
    },

    /// Cancel a task
    CancelTask {
        /// The task ID to cancel
        task_id: String,

        /// Why the task is being canceled
        reason: Option<String>,
    },

    /// Supply input to a task waiting in `input-required`
    ProvideInput {
        /// The task ID to resume
        task_id: String,

        /// The input
        input: Value,
    },

    /// Discover agent capabilities (fetch Agent Card)
    DiscoverAgent,

    /// Subscribe to task updates (streaming)
    SubscribeTask {
        /// The task ID to subscribe to
        task_id: String,
    },
}

impl A2AOperation {
    /// Get the HTTP endpoint path for this operation
    ///
    /// Task IDs are opaque, so they are percent-encoded as a single path segment.
    pub fn endpoint(&self) -> String {
        match self {
            A2AOperation::CreateTask { .. } => "/tasks".to_string(),
            A2AOperation::GetTask { task_id } => task_endpoint(task_id, None),
            A2AOperation::ListTasks { state, limit } => {
                let mut query = form_urlencoded::Serializer::new(String::new());
                if let Some(state) = state {
                    query.append_pair("state", &state.to_string());
                }
                if let Some(limit) = limit {
                    query.append_pair("limit", &limit.to_string());
                }
                let query = query.finish();
                if query.is_empty() {
                    "/tasks".to_string()
                } else {
                    format!("/tasks?{}", query)
                }
            }
            A2AOperation::CancelTask { task_id, .. } => task_endpoint(task_id, Some("cancel")),
            A2AOperation::ProvideInput { task_id, .. } => task_endpoint(task_id, Some("input")),
            A2AOperation::DiscoverAgent => "/.well-known/agent-card.json".to_string(),
            A2AOperation::SubscribeTask { task_id } => task_endpoint(task_id, Some("stream")),
        }
    }

    /// Get the HTTP method for this operation
    pub fn method(&self) -> &'static str {
        match self {
            A2AOperation::CreateTask { .. } => "POST",
            A2AOperation::GetTask { .. } => "GET",
            A2AOperation::ListTasks { .. } => "GET",
            A2AOperation::CancelTask { .. } => "POST",
            A2AOperation::ProvideInput { .. } => "POST",
            A2AOperation::DiscoverAgent => "GET",
            A2AOperation::SubscribeTask { .. } => "GET",
        }
    }

    /// Check if this operation expects a streaming response
    pub fn is_streaming(&self) -> bool {
        matches!(self, A2AOperation::SubscribeTask { .. })
    }

    /// Task the operation targets, if any
    pub fn task_id(&self) -> Option<&str> {
        match self {
            A2AOperation::GetTask { task_id }
            | A2AOperation::CancelTask { task_id, .. }
            | A2AOperation::ProvideInput { task_id, .. }
            | A2AOperation::SubscribeTask { task_id } => Some(task_id),
            A2AOperation::CreateTask { task_id, .. } => task_id.as_deref(),
            _ => None,
        }
    }
}

fn task_endpoint(task_id: &str, action: Option<&str>) -> String {
    let mut endpoint = format!("/tasks/{}", urlencoding::encode(task_id));
    if let Some(action) = action {
        endpoint.push('/');
        endpoint.push_str(action);
    }
    endpoint
}
