//! Validation layer for A2A protocol requests and responses

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::StreamExt;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    protocol::{A2AError, A2AOperation, A2AResult, EventPayload, Task, TaskEvent},
    service::{response::EventFeed, A2ARequest, A2AResponse},
};

/// Layer that validates A2A protocol requests and responses
///
/// Requests are checked before they leave the client. Tasks, cards and artifacts received from
/// the remote are re-validated, so malformed data never reaches the caller.
#[derive(Clone, Debug, Default)]
pub struct A2AValidationLayer;

impl A2AValidationLayer {
    /// Create a new validation layer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for A2AValidationLayer {
    type Service = A2AValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        A2AValidationService { inner }
    }
}

/// Validation service that wraps an inner service
#[derive(Clone, Debug)]
pub struct A2AValidationService<S> {
    inner: S,
}

fn require_task_id(task_id: &str) -> Result<(), A2AError> {
    if task_id.is_empty() {
        return Err(A2AError::Validation("Task ID cannot be empty".into()));
    }
    Ok(())
}

fn validate_task(task: &Task) -> Result<(), A2AError> {
    require_task_id(&task.id)?;
    for artifact in &task.artifacts {
        if artifact.task_id != task.id {
            return Err(A2AError::InvalidArtifactContent(format!(
                "artifact {} belongs to task {}, not {}",
                artifact.id, artifact.task_id, task.id
            )));
        }
        artifact.validate()?;
    }
    Ok(())
}

fn validate_event(event: &TaskEvent) -> Result<(), A2AError> {
    match &event.payload {
        EventPayload::TaskCreated { task } | EventPayload::TaskSnapshot { task } => {
            validate_task(task)
        }
        EventPayload::ArtifactAdded { artifact } => artifact.validate(),
        EventPayload::StateChanged { .. } => Ok(()),
    }
}

impl<S> A2AValidationService<S> {
    /// Validate an A2A request
    fn validate_request(req: &A2ARequest) -> Result<(), A2AError> {
        match &req.operation {
            A2AOperation::CreateTask { kind, task_id, .. } => {
                if kind.is_empty() {
                    return Err(A2AError::Validation("Task kind cannot be empty".into()));
                }
                if let Some(task_id) = task_id {
                    require_task_id(task_id)?;
                }
            }
            A2AOperation::GetTask { task_id }
            | A2AOperation::CancelTask { task_id, .. }
            | A2AOperation::ProvideInput { task_id, .. }
            | A2AOperation::SubscribeTask { task_id } => require_task_id(task_id)?,
            A2AOperation::ListTasks { limit, .. } => {
                if let Some(limit_val) = limit {
                    if *limit_val == 0 {
                        return Err(A2AError::Validation("Limit must be greater than 0".into()));
                    }
                    if *limit_val > 1000 {
                        return Err(A2AError::Validation("Limit cannot exceed 1000".into()));
                    }
                }
            }
            A2AOperation::DiscoverAgent => {}
        }

        if req.context.agent_url.is_empty() {
            return Err(A2AError::Validation("Agent URL cannot be empty".into()));
        }

        Ok(())
    }

    /// Validate an A2A response, wrapping event streams so each event is checked on arrival
    fn validate_response(resp: A2AResponse) -> Result<A2AResponse, A2AError> {
        match &resp {
            A2AResponse::Task(task) => validate_task(task)?,
            A2AResponse::TaskList { tasks, .. } => {
                for task in tasks {
                    validate_task(task)?;
                }
            }
            A2AResponse::AgentCard(card) => card.validate()?,
            A2AResponse::Events(_) | A2AResponse::Empty => {}
        }

        Ok(match resp {
            A2AResponse::Events(feed) => {
                let checked = feed.map(|item| -> A2AResult<TaskEvent> {
                    let event = item?;
                    validate_event(&event)?;
                    Ok(event)
                });
                A2AResponse::Events(EventFeed::new(checked))
            }
            other => other,
        })
    }
}

impl<S> Service<A2ARequest> for A2AValidationService<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        if let Err(e) = Self::validate_request(&req) {
            return Box::pin(async move { Err(e) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.ready().await?.call(req).await?;
            Self::validate_response(response)
        })
    }
}
