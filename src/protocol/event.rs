//! Task lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    artifact::Artifact,
    task::{StateTransition, Task, TaskError, TaskState},
};

/// An event raised by the task manager
///
/// Serialized as `{event, taskId, seq, timestamp, payload}`. `seq` is the per-task sequence
/// number; events of one task are delivered in `seq` order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub task_id: String,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Event body, tagged by event name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum EventPayload {
    /// A task was registered
    TaskCreated { task: Box<Task> },

    /// A task moved between states
    #[serde(rename_all = "camelCase")]
    StateChanged {
        from: TaskState,
        to: TaskState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Input that resumed the task, for `input-required -> working`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
        /// Failure payload, for `-> failed`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<TaskError>,
    },

    /// An artifact was attached to a task
    ArtifactAdded { artifact: Artifact },

    /// Synthetic replay of the current task, sent first to every new subscriber
    TaskSnapshot { task: Box<Task> },
}

impl TaskEvent {
    pub(crate) fn new(task_id: impl Into<String>, seq: u64, payload: EventPayload) -> Self {
        Self::at(task_id, seq, Utc::now(), payload)
    }

    pub(crate) fn at(
        task_id: impl Into<String>,
        seq: u64,
        timestamp: DateTime<Utc>,
        payload: EventPayload,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            seq,
            timestamp,
            payload,
        }
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self.payload {
            EventPayload::TaskCreated { .. } => "task-created",
            EventPayload::StateChanged { .. } => "state-changed",
            EventPayload::ArtifactAdded { .. } => "artifact-added",
            EventPayload::TaskSnapshot { .. } => "task-snapshot",
        }
    }

    /// Whether this event leaves the task in a terminal state
    pub fn is_terminal(&self) -> bool {
        match &self.payload {
            EventPayload::StateChanged { to, .. } => to.is_terminal(),
            EventPayload::TaskSnapshot { task } | EventPayload::TaskCreated { task } => {
                task.is_terminal()
            }
            EventPayload::ArtifactAdded { .. } => false,
        }
    }

    /// Whether this event replaces the receiver's view of the task wholesale
    pub fn is_snapshot(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::TaskSnapshot { .. } | EventPayload::TaskCreated { .. }
        )
    }
}

impl Task {
    /// Fold an event into this task
    ///
    /// Used by consumers that rebuild a task from its event sequence. Snapshots and creation
    /// events replace the task outright.
    pub fn apply(&mut self, event: &TaskEvent) {
        match &event.payload {
            EventPayload::TaskCreated { task } | EventPayload::TaskSnapshot { task } => {
                *self = (**task).clone();
            }
            EventPayload::StateChanged {
                from,
                to,
                reason,
                input,
                error,
            } => {
                self.state = *to;
                self.history.push(StateTransition {
                    from: *from,
                    to: *to,
                    reason: reason.clone(),
                    timestamp: event.timestamp,
                });
                if let Some(input) = input {
                    self.inputs.push(input.clone());
                }
                if let Some(error) = error {
                    self.error = Some(error.clone());
                }
                self.updated_at = Some(event.timestamp);
            }
            EventPayload::ArtifactAdded { artifact } => {
                self.artifacts.push(artifact.clone());
                self.updated_at = Some(event.timestamp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::artifact::create_artifact;

    fn state_changed(from: TaskState, to: TaskState) -> EventPayload {
        EventPayload::StateChanged {
            from,
            to,
            reason: None,
            input: None,
            error: None,
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let event = TaskEvent::new(
            "task-1",
            2,
            EventPayload::StateChanged {
                from: TaskState::Submitted,
                to: TaskState::Working,
                reason: Some("picked up".into()),
                input: None,
                error: None,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "state-changed");
        assert_eq!(json["taskId"], "task-1");
        assert_eq!(json["seq"], 2);
        assert_eq!(json["payload"]["from"], "submitted");
        assert_eq!(json["payload"]["to"], "working");
        assert_eq!(json["payload"]["reason"], "picked up");
        assert!(json["payload"].get("error").is_none());

        let parsed: TaskEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.name(), "state-changed");
    }

    #[test]
    fn test_terminal_detection() {
        let done = TaskEvent::new("t", 3, state_changed(TaskState::Working, TaskState::Completed));
        assert!(done.is_terminal());

        let paused = TaskEvent::new(
            "t",
            3,
            state_changed(TaskState::Working, TaskState::InputRequired),
        );
        assert!(!paused.is_terminal());

        let mut task = Task::new("t", "echo", json!(null));
        task.state = TaskState::Canceled;
        let snapshot = TaskEvent::new("t", 4, EventPayload::TaskSnapshot { task: Box::new(task) });
        assert!(snapshot.is_terminal());
        assert!(snapshot.is_snapshot());
    }

    #[test]
    fn test_apply_rebuilds_task() {
        let original = Task::new("t", "echo", json!({"text": "hi"}));
        let mut task = Task::new("placeholder", "other", json!(null));

        task.apply(&TaskEvent::new(
            "t",
            1,
            EventPayload::TaskCreated {
                task: Box::new(original.clone()),
            },
        ));
        assert_eq!(task, original);

        task.apply(&TaskEvent::new(
            "t",
            2,
            state_changed(TaskState::Submitted, TaskState::Working),
        ));
        let artifact = create_artifact("text", json!("hi"), "t").unwrap();
        task.apply(&TaskEvent::new(
            "t",
            3,
            EventPayload::ArtifactAdded {
                artifact: artifact.clone(),
            },
        ));
        task.apply(&TaskEvent::new(
            "t",
            4,
            EventPayload::StateChanged {
                from: TaskState::Working,
                to: TaskState::Failed,
                reason: None,
                input: None,
                error: Some(TaskError::new("BOOM", "exploded")),
            },
        ));

        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.history.len(), 2);
        assert_eq!(task.artifacts, vec![artifact]);
        assert_eq!(task.error.as_ref().map(|e| e.code.as_str()), Some("BOOM"));
    }
}
