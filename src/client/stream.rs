//! Reconnecting task event stream
//!
//! Follows one task until it reaches a terminal state. The stream keeps a local projection of
//! the task: snapshots replace it, every other event is folded into it. Duplicate events are
//! skipped; a gap in sequence numbers, a transient failure, or the server closing the stream
//! early all cause a resubscribe, which starts again from a fresh snapshot.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    stream::{self, BoxStream, Stream},
    StreamExt,
};
use tower::ServiceExt;
use tower_service::Service;
use tracing::{debug, warn};

use crate::{
    layer::RetryPolicy,
    protocol::{A2AError, A2AOperation, A2AResult, EventPayload, RemoteError, Task, TaskEvent},
    service::{response::EventFeed, A2ARequest, A2AResponse, RequestContext},
};

/// One event together with the task as it stands after the event
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    /// The event as received
    pub event: TaskEvent,

    /// Local projection of the task after applying the event
    pub task: Task,
}

/// Ordered updates of one task, ending after its terminal event
pub struct TaskStream {
    inner: BoxStream<'static, A2AResult<TaskUpdate>>,
}

impl TaskStream {
    pub(crate) fn new<S>(
        service: S,
        context: RequestContext,
        task_id: String,
        retry: RetryPolicy,
        max_reconnects: u32,
    ) -> Self
    where
        S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Send + 'static,
        S::Future: Send,
    {
        let state = StreamState {
            service,
            context,
            task_id,
            retry,
            max_reconnects,
            reconnects: 0,
            feed: None,
            task: None,
            last_seq: 0,
            done: false,
        };

        let inner = stream::unfold(state, |mut state| async move {
            let item = state.next_update().await;
            item.map(|item| (item, state))
        })
        .boxed();

        Self { inner }
    }

    /// Drain the stream and return the task in its terminal state
    pub async fn into_final_task(mut self) -> A2AResult<Task> {
        let mut last = None;
        while let Some(update) = self.next().await {
            last = Some(update?.task);
        }
        last.ok_or_else(|| {
            RemoteError::Protocol("task stream ended without any update".into()).into()
        })
    }
}

impl Stream for TaskStream {
    type Item = A2AResult<TaskUpdate>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for TaskStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStream").finish_non_exhaustive()
    }
}

enum Accepted {
    Update(Box<TaskUpdate>),
    Skip,
    Gap { expected: u64, got: u64 },
}

struct StreamState<S> {
    service: S,
    context: RequestContext,
    task_id: String,
    retry: RetryPolicy,
    max_reconnects: u32,
    reconnects: u32,
    feed: Option<EventFeed>,
    task: Option<Task>,
    last_seq: u64,
    done: bool,
}

impl<S> StreamState<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Send + 'static,
    S::Future: Send,
{
    async fn connect(&mut self) -> A2AResult<()> {
        let request = A2ARequest::new(
            A2AOperation::SubscribeTask {
                task_id: self.task_id.clone(),
            },
            self.context.clone(),
        );
        match self.service.ready().await?.call(request).await? {
            A2AResponse::Events(feed) => {
                debug!(task_id = %self.task_id, "subscribed to task events");
                self.feed = Some(feed);
                Ok(())
            }
            _ => Err(RemoteError::Protocol("Expected event stream from subscribe".into()).into()),
        }
    }

    /// Drop the current feed and wait before the next subscribe attempt
    async fn back_off(&mut self, cause: Option<A2AError>) -> A2AResult<()> {
        self.feed = None;
        if self.reconnects >= self.max_reconnects {
            return Err(cause.unwrap_or_else(|| {
                RemoteError::Transport("event stream closed before the task finished".into())
                    .into()
            }));
        }

        let delay = self.retry.backoff(self.reconnects);
        self.reconnects += 1;
        warn!(
            task_id = %self.task_id,
            attempt = self.reconnects,
            max_reconnects = self.max_reconnects,
            ?delay,
            error = ?cause,
            "resubscribing to task events"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }

    fn accept(&mut self, event: TaskEvent) -> Accepted {
        if event.task_id != self.task_id {
            warn!(
                task_id = %self.task_id,
                other = %event.task_id,
                "ignoring event for another task"
            );
            return Accepted::Skip;
        }

        match &event.payload {
            EventPayload::TaskSnapshot { task } => {
                self.task = Some((**task).clone());
            }
            EventPayload::TaskCreated { task } => {
                if self.task.is_some() && event.seq <= self.last_seq {
                    return Accepted::Skip;
                }
                self.task = Some((**task).clone());
            }
            _ => {
                let Some(task) = self.task.as_mut() else {
                    debug!(task_id = %self.task_id, seq = event.seq, "event before snapshot");
                    return Accepted::Skip;
                };
                if event.seq <= self.last_seq {
                    debug!(task_id = %self.task_id, seq = event.seq, "duplicate event");
                    return Accepted::Skip;
                }
                if event.seq > self.last_seq + 1 {
                    return Accepted::Gap {
                        expected: self.last_seq + 1,
                        got: event.seq,
                    };
                }
                task.apply(&event);
            }
        }

        self.last_seq = event.seq;
        match &self.task {
            Some(task) => Accepted::Update(Box::new(TaskUpdate {
                task: task.clone(),
                event,
            })),
            None => Accepted::Skip,
        }
    }

    async fn next_update(&mut self) -> Option<A2AResult<TaskUpdate>> {
        loop {
            if self.done {
                return None;
            }

            if self.feed.is_none() {
                if let Err(err) = self.connect().await {
                    if !err.is_transient() {
                        self.done = true;
                        return Some(Err(err));
                    }
                    if let Err(err) = self.back_off(Some(err)).await {
                        self.done = true;
                        return Some(Err(err));
                    }
                    continue;
                }
            }

            let Some(feed) = self.feed.as_mut() else {
                continue;
            };

            let outcome = match feed.next().await {
                Some(Ok(event)) => match self.accept(event) {
                    Accepted::Update(update) => {
                        if update.event.is_snapshot() {
                            self.reconnects = 0;
                        }
                        if update.task.is_terminal() {
                            self.done = true;
                            self.feed = None;
                        }
                        return Some(Ok(*update));
                    }
                    Accepted::Skip => continue,
                    Accepted::Gap { expected, got } => {
                        warn!(
                            task_id = %self.task_id,
                            expected,
                            got,
                            "sequence gap in task events"
                        );
                        self.back_off(None).await
                    }
                },
                Some(Err(err)) if err.is_transient() => self.back_off(Some(err)).await,
                Some(Err(err)) => Err(err),
                None => self.back_off(None).await,
            };

            if let Err(err) = outcome {
                self.done = true;
                self.feed = None;
                return Some(Err(err));
            }
        }
    }
}
