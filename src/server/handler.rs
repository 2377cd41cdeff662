//! Maps transport requests onto task manager operations

use bytes::Bytes;
use futures::{stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::manager::TaskManager;
use crate::{
    codec::SseCodec,
    protocol::{
        A2AError, A2AResult, CreateTaskRequest, RemoteError, TaskListResponse, TaskState,
    },
    service::REQUEST_ID_HEADER,
    transport::{ByteStream, TransportRequest, TransportResponse},
};

const JSON_CONTENT_TYPE: &str = "application/a2a+json";

#[derive(Debug, PartialEq)]
enum Route {
    AgentCard,
    CreateTask,
    ListTasks,
    GetTask(String),
    CancelTask(String),
    ProvideInput(String),
    Subscribe(String),
}

impl Route {
    /// Match a request; path segments are percent-decoded after splitting, so an encoded `/`
    /// stays inside its segment
    fn parse(method: &str, path: &str) -> Option<Self> {
        let decoded = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).ok())
            .collect::<Option<Vec<_>>>()?;
        let segments: Vec<&str> = decoded.iter().map(|s| &**s).collect();

        let route = match (method, segments.as_slice()) {
            ("GET", [".well-known", "agent-card.json"]) => Route::AgentCard,
            ("POST", ["tasks"]) => Route::CreateTask,
            ("GET", ["tasks"]) => Route::ListTasks,
            ("GET", ["tasks", id]) => Route::GetTask(id.to_string()),
            ("POST", ["tasks", id, "cancel"]) => Route::CancelTask(id.to_string()),
            ("POST", ["tasks", id, "input"]) => Route::ProvideInput(id.to_string()),
            ("GET", ["tasks", id, "stream"]) => Route::Subscribe(id.to_string()),
            _ => return None,
        };
        Some(route)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CancelBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InputBody {
    input: Value,
}

/// Serves the task core over any request/response binding
///
/// Requests are matched on method and path; failures are answered with an error body and the
/// status of the error kind.
#[derive(Clone, Debug)]
pub struct TaskHandler {
    manager: TaskManager,
}

impl TaskHandler {
    /// Create a handler serving `manager`
    pub fn new(manager: TaskManager) -> Self {
        Self { manager }
    }

    /// The task manager behind this handler
    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// Handle a single-response request
    pub async fn handle(&self, request: TransportRequest) -> TransportResponse {
        let request_id = request
            .headers
            .get(REQUEST_ID_HEADER)
            .cloned()
            .unwrap_or_default();
        debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            %request_id,
            "handling request"
        );
        match self.dispatch(&request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%request_id, error = %err, status = err.status(), "request failed");
                error_response(&err)
            }
        }
    }

    /// Handle a task subscription, producing the SSE body
    ///
    /// The body ends after the task's terminal event. If the subscription ends before that,
    /// because the subscriber fell behind or the manager shut down, a final `error` frame
    /// says why. Dropping the body releases the subscription.
    pub async fn handle_stream(&self, request: TransportRequest) -> A2AResult<ByteStream> {
        let task_id = match Route::parse(&request.method, request.path()) {
            Some(Route::Subscribe(task_id)) => task_id,
            _ => {
                return Err(A2AError::Validation(format!(
                    "{} {} is not a streaming endpoint",
                    request.method, request.endpoint
                )))
            }
        };

        let subscription = self.manager.subscribe(&task_id).await?;
        let manager = self.manager.clone();
        let frames = stream::unfold(Some((subscription, false)), move |state| {
            let manager = manager.clone();
            async move {
                let (mut subscription, finished) = state?;
                match subscription.recv().await {
                    Some(event) => {
                        let finished = event.is_terminal();
                        Some((SseCodec::encode_event(&event), Some((subscription, finished))))
                    }
                    None if finished => None,
                    None => {
                        let err = if manager.is_shut_down() {
                            A2AError::ShutDown
                        } else {
                            RemoteError::Transport(format!(
                                "subscription to task {} was dropped",
                                subscription.task_id()
                            ))
                            .into()
                        };
                        debug!(
                            task_id = %subscription.task_id(),
                            error = %err,
                            "stream ended early"
                        );
                        Some((Ok(SseCodec::encode_error(&err)), None))
                    }
                }
            }
        });
        Ok(frames.boxed())
    }

    async fn dispatch(&self, request: &TransportRequest) -> A2AResult<TransportResponse> {
        let Some(route) = Route::parse(&request.method, request.path()) else {
            return Ok(not_found(request));
        };

        match route {
            Route::AgentCard => json_response(200, self.manager.card()),
            Route::CreateTask => {
                let body: CreateTaskRequest = parse_body(&request.body)?;
                let task = match body.task_id {
                    Some(task_id) => {
                        self.manager
                            .create_task_with_id(task_id, &body.kind, body.input, body.metadata)
                            .await?
                    }
                    None => {
                        self.manager
                            .create_task(&body.kind, body.input, body.metadata)
                            .await?
                    }
                };
                json_response(201, &task)
            }
            Route::ListTasks => {
                let query = request.query();
                let state = query
                    .get("state")
                    .map(|state| {
                        serde_json::from_value::<TaskState>(Value::String(state.clone()))
                            .map_err(|_| A2AError::Validation(format!("Unknown state: {}", state)))
                    })
                    .transpose()?;
                let limit = query
                    .get("limit")
                    .map(|limit| {
                        limit
                            .parse::<usize>()
                            .map_err(|_| A2AError::Validation(format!("Invalid limit: {}", limit)))
                    })
                    .transpose()?;

                let mut tasks = self.manager.list_tasks(state, None).await?;
                let total = tasks.len();
                if let Some(limit) = limit {
                    tasks.truncate(limit);
                }
                json_response(200, &TaskListResponse { tasks, total })
            }
            Route::GetTask(task_id) => json_response(200, &self.manager.get_task(&task_id).await?),
            Route::CancelTask(task_id) => {
                let body: CancelBody = if request.body.is_empty() {
                    CancelBody::default()
                } else {
                    parse_body(&request.body)?
                };
                json_response(200, &self.manager.cancel(&task_id, body.reason).await?)
            }
            Route::ProvideInput(task_id) => {
                let body: InputBody = parse_body(&request.body)?;
                json_response(
                    200,
                    &self.manager.provide_input(&task_id, body.input).await?,
                )
            }
            Route::Subscribe(_) => Err(A2AError::Validation(
                "task streams must be requested as a streaming call".into(),
            )),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> A2AResult<T> {
    serde_json::from_slice(body).map_err(|e| A2AError::Validation(format!("Invalid body: {}", e)))
}

fn json_response<T: Serialize + ?Sized>(status: u16, value: &T) -> A2AResult<TransportResponse> {
    let body = serde_json::to_vec(value)?;
    Ok(TransportResponse::new(status)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(Bytes::from(body)))
}

fn error_response(err: &A2AError) -> TransportResponse {
    let body = serde_json::to_vec(&err.to_body()).unwrap_or_default();
    TransportResponse::new(err.status())
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(Bytes::from(body))
}

fn not_found(request: &TransportRequest) -> TransportResponse {
    let body = serde_json::json!({
        "code": "NOT_FOUND",
        "message": format!("No route for {} {}", request.method, request.path()),
    });
    TransportResponse::new(404)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(Bytes::from(body.to_string()))
}
