//! A2A service response types

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    stream::{BoxStream, Stream},
    StreamExt,
};

use crate::protocol::{A2AResult, AgentCard, Task, TaskEvent};

/// Response from an A2A service operation
#[derive(Debug)]
pub enum A2AResponse {
    /// Task response (from CreateTask, GetTask, CancelTask, ProvideInput)
    Task(Box<Task>),

    /// Task list response (from ListTasks)
    TaskList {
        /// The tasks matching the query, up to the requested limit
        tasks: Vec<Task>,

        /// Total number of tasks matching the query
        total: usize,
    },

    /// Agent card response (from DiscoverAgent)
    AgentCard(Box<AgentCard>),

    /// Event stream (from SubscribeTask)
    Events(EventFeed),

    /// Empty response (for operations with no return value)
    Empty,
}

impl A2AResponse {
    /// Extract a task from the response, if present
    pub fn into_task(self) -> Option<Task> {
        match self {
            A2AResponse::Task(task) => Some(*task),
            _ => None,
        }
    }

    /// Extract a task list from the response, if present
    pub fn into_task_list(self) -> Option<Vec<Task>> {
        match self {
            A2AResponse::TaskList { tasks, .. } => Some(tasks),
            _ => None,
        }
    }

    /// Extract an event stream from the response, if present
    pub fn into_events(self) -> Option<EventFeed> {
        match self {
            A2AResponse::Events(feed) => Some(feed),
            _ => None,
        }
    }

    /// Check if the response is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, A2AResponse::Empty)
    }
}

/// Decoded events of one task subscription
///
/// Yields events as the remote produced them; gaps and duplicates are left to the consumer.
pub struct EventFeed {
    inner: BoxStream<'static, A2AResult<TaskEvent>>,
}

impl EventFeed {
    /// Wrap a stream of decoded events
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = A2AResult<TaskEvent>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }
}

impl Stream for EventFeed {
    type Item = A2AResult<TaskEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFeed").finish_non_exhaustive()
    }
}
