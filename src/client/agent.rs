//! High-level A2A agent client

use std::{collections::HashMap, time::Duration};

use serde_json::Value;
use tower::ServiceExt;
use tower_service::Service;

use crate::{
    client::{config::ClientConfig, stream::TaskStream},
    protocol::{A2AError, A2AOperation, A2AResult, AgentCard, RemoteError, Task, TaskState},
    service::{A2ARequest, A2AResponse, RequestContext},
};

/// A task accepted by a remote agent
#[derive(Debug, Clone, PartialEq)]
pub struct TaskHandle {
    /// ID the agent assigned to the task
    pub task_id: String,

    /// The task as returned by the agent on creation
    pub task: Task,
}

impl TaskHandle {
    /// The task ID
    pub fn id(&self) -> &str {
        &self.task_id
    }
}

/// High-level A2A client for interacting with agents
///
/// This client wraps a Tower service and provides convenient methods for the task operations.
/// The service is generic over any implementation that satisfies the Service trait bounds.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_taskhub::prelude::*;
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<(), A2AError> {
/// let url = "https://agent.example.com".parse().unwrap();
/// let mut client = A2AClientBuilder::new_http(url).build()?;
///
/// let handle = client.submit("echo", json!({"text": "hi"}), HashMap::new()).await?;
/// let task = client.stream(handle.id()).into_final_task().await?;
/// println!("Task {} finished as {}", task.id, task.state);
/// # Ok(())
/// # }
/// ```
pub struct AgentClient<S> {
    service: S,
    config: ClientConfig,
}

impl<S> AgentClient<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send + 'static,
    S::Future: Send,
{
    /// Create a new agent client
    ///
    /// # Arguments
    ///
    /// * `service` - The Tower service that handles requests
    /// * `config` - Client configuration
    pub fn new(service: S, config: ClientConfig) -> Self {
        Self { service, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a request context from the client configuration
    fn build_context(&self) -> RequestContext {
        RequestContext::new(self.config.agent_url.clone()).with_timeout(self.config.timeout)
    }

    async fn execute(&mut self, operation: A2AOperation) -> A2AResult<A2AResponse> {
        let request = A2ARequest::new(operation, self.build_context());
        self.service.ready().await?.call(request).await
    }

    async fn execute_task(&mut self, operation: A2AOperation, what: &str) -> A2AResult<Task> {
        match self.execute(operation).await? {
            A2AResponse::Task(task) => Ok(*task),
            _ => Err(RemoteError::Protocol(format!("Expected task response from {}", what)).into()),
        }
    }

    /// Submit a new task to the agent
    ///
    /// # Errors
    ///
    /// Returns `A2AError::UnsupportedTaskKind` if the agent does not declare `kind`
    pub async fn submit(
        &mut self,
        kind: impl Into<String>,
        input: Value,
        metadata: HashMap<String, Value>,
    ) -> A2AResult<TaskHandle> {
        self.submit_task(kind.into(), input, metadata, None).await
    }

    /// Submit a new task under a caller-chosen ID
    ///
    /// Resubmitting after a lost response is safe: the agent answers a duplicate ID with
    /// `A2AError::TaskAlreadyExists` instead of creating a second task.
    pub async fn submit_with_id(
        &mut self,
        task_id: impl Into<String>,
        kind: impl Into<String>,
        input: Value,
        metadata: HashMap<String, Value>,
    ) -> A2AResult<TaskHandle> {
        self.submit_task(kind.into(), input, metadata, Some(task_id.into()))
            .await
    }

    async fn submit_task(
        &mut self,
        kind: String,
        input: Value,
        metadata: HashMap<String, Value>,
        task_id: Option<String>,
    ) -> A2AResult<TaskHandle> {
        let operation = A2AOperation::CreateTask {
            kind,
            input,
            metadata,
            task_id,
        };
        let task = self.execute_task(operation, "submit").await?;
        Ok(TaskHandle {
            task_id: task.id.clone(),
            task,
        })
    }

    /// Get the current state of a task
    ///
    /// # Errors
    ///
    /// Returns `A2AError::TaskNotFound` if the task doesn't exist
    pub async fn get_status(&mut self, task_id: &str) -> A2AResult<Task> {
        let operation = A2AOperation::GetTask {
            task_id: task_id.to_string(),
        };
        self.execute_task(operation, "get_status").await
    }

    /// List tasks, optionally filtered by state
    ///
    /// # Arguments
    ///
    /// * `state` - Optional filter by task state
    /// * `limit` - Maximum number of tasks to return
    pub async fn list_tasks(
        &mut self,
        state: Option<TaskState>,
        limit: Option<u32>,
    ) -> A2AResult<Vec<Task>> {
        match self.execute(A2AOperation::ListTasks { state, limit }).await? {
            A2AResponse::TaskList { tasks, .. } => Ok(tasks),
            _ => Err(
                RemoteError::Protocol("Expected task list response from list_tasks".into()).into(),
            ),
        }
    }

    /// Cancel a task
    ///
    /// Canceling a task that already finished returns it unchanged.
    pub async fn cancel(&mut self, task_id: &str, reason: Option<String>) -> A2AResult<Task> {
        let operation = A2AOperation::CancelTask {
            task_id: task_id.to_string(),
            reason,
        };
        self.execute_task(operation, "cancel").await
    }

    /// Supply input to a task waiting in `input-required`
    pub async fn provide_input(&mut self, task_id: &str, input: Value) -> A2AResult<Task> {
        let operation = A2AOperation::ProvideInput {
            task_id: task_id.to_string(),
            input,
        };
        self.execute_task(operation, "provide_input").await
    }

    /// Discover agent capabilities by fetching the Agent Card
    ///
    /// This retrieves the agent's metadata from `/.well-known/agent-card.json`
    pub async fn discover(&mut self) -> A2AResult<AgentCard> {
        match self.execute(A2AOperation::DiscoverAgent).await? {
            A2AResponse::AgentCard(card) => Ok(*card),
            _ => Err(
                RemoteError::Protocol("Expected agent card response from discover".into()).into(),
            ),
        }
    }

    /// Follow a task's events until it reaches a terminal state
    ///
    /// Nothing is sent until the stream is first polled. The stream reconnects on its own
    /// after transient failures, up to the configured reconnect budget.
    pub fn stream(&self, task_id: &str) -> TaskStream {
        TaskStream::new(
            self.service.clone(),
            self.build_context(),
            task_id.to_string(),
            self.config.retry.clone(),
            self.config.max_reconnects,
        )
    }

    /// Poll a task until it reaches a terminal state
    ///
    /// For agents without streaming. `max_attempts` of 0 polls forever.
    pub async fn poll_until_complete(
        &mut self,
        task_id: &str,
        poll_interval: Duration,
        max_attempts: usize,
    ) -> A2AResult<Task> {
        let mut attempts = 0;

        loop {
            let task = self.get_status(task_id).await?;

            if task.is_terminal() {
                return Ok(task);
            }

            attempts += 1;
            if max_attempts > 0 && attempts >= max_attempts {
                return Err(RemoteError::Timeout.into());
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
