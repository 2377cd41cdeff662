//! Server-Sent Events (SSE) codec for task event streams
//!
//! Every task event is one SSE frame: the event name, the per-task sequence number as the
//! frame ID, and the JSON event as data. A failure mid-stream is sent as an `error` frame
//! carrying an error body.

use std::fmt::Display;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use crate::protocol::{A2AError, A2AResult, ErrorBody, RemoteError, TaskEvent};

const ERROR_EVENT: &str = "error";

/// SSE codec for task event streams
#[derive(Debug, Clone, Default)]
pub struct SseCodec;

impl SseCodec {
    /// Create a new SSE codec
    pub fn new() -> Self {
        Self
    }

    /// Encode one task event as an SSE frame
    pub fn encode_event(event: &TaskEvent) -> A2AResult<Bytes> {
        let data = serde_json::to_string(event)?;
        Ok(Bytes::from(format!(
            "event: {}\nid: {}\ndata: {}\n\n",
            event.name(),
            event.seq,
            data
        )))
    }

    /// Encode a failure as an SSE `error` frame
    pub fn encode_error(err: &A2AError) -> Bytes {
        let data = serde_json::to_string(&err.to_body()).unwrap_or_default();
        Bytes::from(format!("event: {}\ndata: {}\n\n", ERROR_EVENT, data))
    }

    /// Parse an SSE byte stream into task events
    ///
    /// Frames that cannot be decoded surface as protocol errors; `error` frames are turned back
    /// into the error kind the server raised.
    pub fn parse_stream<S, E>(&self, byte_stream: S) -> impl Stream<Item = A2AResult<TaskEvent>>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        byte_stream
            .eventsource()
            .map(|result| -> A2AResult<TaskEvent> {
                let frame = result
                    .map_err(|e| RemoteError::Transport(format!("SSE stream error: {}", e)))?;

                if frame.event == ERROR_EVENT {
                    let body: ErrorBody = serde_json::from_str(&frame.data).map_err(|e| {
                        RemoteError::Protocol(format!("Failed to parse SSE error frame: {}", e))
                    })?;
                    return Err(body.into_error(500));
                }

                let event = serde_json::from_str(&frame.data).map_err(|e| {
                    RemoteError::Protocol(format!("Failed to parse SSE event data: {}", e))
                })?;
                Ok(event)
            })
    }
}

#[cfg(test)]
mod tests {
    use futures::pin_mut;
    use serde_json::json;

    use super::*;
    use crate::protocol::{EventPayload, Task, TaskState};

    fn frames(events: &[TaskEvent]) -> Bytes {
        let mut buf = Vec::new();
        for event in events {
            buf.extend_from_slice(&SseCodec::encode_event(event).unwrap());
        }
        Bytes::from(buf)
    }

    #[test]
    fn test_encode_frame_layout() {
        let event = TaskEvent::new(
            "task-1",
            7,
            EventPayload::TaskSnapshot {
                task: Box::new(Task::new("task-1", "echo", json!(null))),
            },
        );
        let frame = SseCodec::encode_event(&event).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("event: task-snapshot"));
        assert_eq!(lines.next(), Some("id: 7"));
        assert!(lines.next().unwrap().starts_with("data: {"));
        assert!(text.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_parse_event_stream() {
        let codec = SseCodec;
        let events = vec![
            TaskEvent::new(
                "task-1",
                1,
                EventPayload::TaskSnapshot {
                    task: Box::new(Task::new("task-1", "echo", json!("hi"))),
                },
            ),
            TaskEvent::new(
                "task-1",
                2,
                EventPayload::StateChanged {
                    from: TaskState::Submitted,
                    to: TaskState::Working,
                    reason: None,
                    input: None,
                    error: None,
                },
            ),
        ];

        // split mid-frame to exercise buffering
        let data = frames(&events);
        let (head, tail) = data.split_at(data.len() / 2);
        let chunks = vec![
            Ok::<_, A2AError>(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ];

        let stream = codec.parse_stream(futures::stream::iter(chunks));
        pin_mut!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, events[0]);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.seq, 2);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parse_error_frame() {
        let codec = SseCodec;
        let frame = SseCodec::encode_error(&A2AError::TaskNotFound {
            task_id: "gone".into(),
        });

        let stream = codec.parse_stream(futures::stream::once(async move {
            Ok::<_, A2AError>(frame)
        }));
        pin_mut!(stream);

        match stream.next().await.unwrap() {
            Err(A2AError::TaskNotFound { task_id }) => assert_eq!(task_id, "gone"),
            other => panic!("Expected TaskNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_garbage_data() {
        let codec = SseCodec;
        let stream = codec.parse_stream(futures::stream::once(async {
            Ok::<_, A2AError>(Bytes::from_static(b"event: state-changed\ndata: {oops\n\n"))
        }));
        pin_mut!(stream);

        let result = stream.next().await.unwrap();
        assert!(matches!(
            result,
            Err(A2AError::Remote(RemoteError::Protocol(_)))
        ));
    }
}
