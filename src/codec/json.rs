//! JSON codec for HTTP+JSON binding

use bytes::Bytes;
use serde_json::json;

use crate::{
    codec::Codec,
    protocol::{A2AError, A2AOperation, AgentCard, CreateTaskRequest, Task, TaskListResponse},
    service::response::A2AResponse,
};

/// JSON codec for the HTTP+JSON protocol binding
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn encode_request(&self, operation: &A2AOperation) -> Result<Bytes, A2AError> {
        let json = match operation {
            A2AOperation::CreateTask {
                kind,
                input,
                metadata,
                task_id,
            } => serde_json::to_value(CreateTaskRequest {
                kind: kind.clone(),
                input: input.clone(),
                metadata: metadata.clone(),
                task_id: task_id.clone(),
            })?,
            A2AOperation::CancelTask { reason, .. } => match reason {
                Some(reason) => json!({ "reason": reason }),
                None => json!({}),
            },
            A2AOperation::ProvideInput { input, .. } => json!({ "input": input }),
            // GET requests carry no body
            A2AOperation::GetTask { .. }
            | A2AOperation::ListTasks { .. }
            | A2AOperation::DiscoverAgent
            | A2AOperation::SubscribeTask { .. } => return Ok(Bytes::new()),
        };

        let bytes = serde_json::to_vec(&json)?;
        Ok(Bytes::from(bytes))
    }

    fn decode_response(
        &self,
        body: &[u8],
        operation: &A2AOperation,
    ) -> Result<A2AResponse, A2AError> {
        if body.is_empty() {
            return Ok(A2AResponse::Empty);
        }

        match operation {
            A2AOperation::CreateTask { .. }
            | A2AOperation::GetTask { .. }
            | A2AOperation::CancelTask { .. }
            | A2AOperation::ProvideInput { .. } => {
                let task: Task = serde_json::from_slice(body)?;
                Ok(A2AResponse::Task(Box::new(task)))
            }
            A2AOperation::ListTasks { .. } => {
                let list: TaskListResponse = serde_json::from_slice(body)?;
                Ok(A2AResponse::TaskList {
                    tasks: list.tasks,
                    total: list.total,
                })
            }
            A2AOperation::DiscoverAgent => {
                let card: AgentCard = serde_json::from_slice(body)?;
                Ok(A2AResponse::AgentCard(Box::new(card)))
            }
            // Streaming responses are decoded by the SSE codec
            A2AOperation::SubscribeTask { .. } => Ok(A2AResponse::Empty),
        }
    }

    fn content_type(&self) -> &str {
        "application/a2a+json"
    }
}
