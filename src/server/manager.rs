//! Task registry and lifecycle state machine

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    config::ManagerConfig,
    stream::{EventHub, Subscription},
};
use crate::protocol::{
    A2AError, A2AResult, AgentCard, Artifact, EventPayload, Task, TaskError, TaskEvent, TaskState,
};

/// Owns every task of one agent and serializes their lifecycle
///
/// Mutations of one task are serialized by that task's lock; operations on different tasks run
/// in parallel. The registry lock is only taken to insert or look up a task. Cloning is cheap
/// and every clone shares the same registry.
///
/// # Example
///
/// ```rust,no_run
/// use a2a_taskhub::prelude::*;
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<(), A2AError> {
/// let card = AgentCard::builder("echo-agent")
///     .version("1.0.0")
///     .capability("echo")
///     .build()?;
/// let manager = TaskManager::new(card);
///
/// let task = manager.create_task("echo", json!({"text": "hi"}), HashMap::new()).await?;
/// manager.transition(&task.id, TaskState::Working, None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskManager {
    inner: Arc<Inner>,
}

struct Inner {
    card: AgentCard,
    config: ManagerConfig,
    tasks: RwLock<HashMap<String, Arc<Mutex<TaskRecord>>>>,
    observers: broadcast::Sender<TaskEvent>,
    shut_down: AtomicBool,
}

struct TaskRecord {
    task: Task,
    seq: u64,
    hub: EventHub,
}

impl TaskRecord {
    /// Stamp the next sequence number and fan the event out
    fn emit(
        &mut self,
        at: DateTime<Utc>,
        payload: EventPayload,
        observers: &broadcast::Sender<TaskEvent>,
    ) {
        self.seq += 1;
        let event = TaskEvent::at(self.task.id.clone(), self.seq, at, payload);
        self.hub.publish(&event);
        // no observers is fine
        let _ = observers.send(event);
    }
}

impl TaskManager {
    /// Create a manager for the agent described by `card`
    pub fn new(card: AgentCard) -> Self {
        Self::with_config(card, ManagerConfig::default())
    }

    /// Create a manager with explicit configuration
    pub fn with_config(card: AgentCard, config: ManagerConfig) -> Self {
        let (observers, _) = broadcast::channel(config.observer_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                card,
                config,
                tasks: RwLock::new(HashMap::new()),
                observers,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// The agent card this manager serves
    pub fn card(&self) -> &AgentCard {
        &self.inner.card
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Register a new task in `submitted` under a generated ID
    pub async fn create_task(
        &self,
        kind: &str,
        input: Value,
        metadata: HashMap<String, Value>,
    ) -> A2AResult<Task> {
        self.create_task_with_id(Uuid::now_v7().to_string(), kind, input, metadata)
            .await
    }

    /// Register a new task in `submitted` under a caller-chosen ID
    pub async fn create_task_with_id(
        &self,
        task_id: impl Into<String>,
        kind: &str,
        input: Value,
        metadata: HashMap<String, Value>,
    ) -> A2AResult<Task> {
        self.ensure_running()?;
        let task_id = task_id.into();
        if task_id.is_empty() {
            return Err(A2AError::Validation("Task ID cannot be empty".into()));
        }
        if !self.inner.card.supports(kind) {
            return Err(A2AError::UnsupportedTaskKind {
                kind: kind.to_string(),
            });
        }

        let task = Task::new(task_id.clone(), kind, input).with_metadata(metadata);
        let mut record = TaskRecord {
            task: task.clone(),
            seq: 0,
            hub: EventHub::new(),
        };

        let mut tasks = self.inner.tasks.write().await;
        if tasks.contains_key(&task_id) {
            return Err(A2AError::TaskAlreadyExists { task_id });
        }
        record.emit(
            task.created_at,
            EventPayload::TaskCreated {
                task: Box::new(task.clone()),
            },
            &self.inner.observers,
        );
        tasks.insert(task_id.clone(), Arc::new(Mutex::new(record)));
        drop(tasks);

        info!(task_id = %task_id, kind, "task created");
        Ok(task)
    }

    /// Current state of a task
    pub async fn get_task(&self, task_id: &str) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let record = entry.lock().await;
        Ok(record.task.clone())
    }

    /// List tasks in creation order, optionally filtered by state
    pub async fn list_tasks(
        &self,
        state: Option<TaskState>,
        limit: Option<usize>,
    ) -> A2AResult<Vec<Task>> {
        self.ensure_running()?;
        let entries: Vec<_> = self.inner.tasks.read().await.values().cloned().collect();

        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = entry.lock().await;
            if state.map_or(true, |state| record.task.state == state) {
                tasks.push(record.task.clone());
            }
        }
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    /// Move a task along a legal edge of the lifecycle graph
    pub async fn transition(
        &self,
        task_id: &str,
        to: TaskState,
        reason: Option<String>,
    ) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;
        self.apply_transition(&mut record, to, reason, None, None)?;
        Ok(record.task.clone())
    }

    /// Resume a task waiting in `input-required`
    pub async fn provide_input(&self, task_id: &str, input: Value) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;
        if record.task.state != TaskState::InputRequired {
            return Err(A2AError::InvalidTransition {
                task_id: task_id.to_string(),
                from: record.task.state,
                to: TaskState::Working,
            });
        }
        self.apply_transition(
            &mut record,
            TaskState::Working,
            Some("input provided".to_string()),
            Some(input),
            None,
        )?;
        Ok(record.task.clone())
    }

    /// Move a working task to `failed`, recording the error
    pub async fn fail(&self, task_id: &str, error: TaskError) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;
        let reason = Some(error.message.clone());
        self.apply_transition(&mut record, TaskState::Failed, reason, None, Some(error))?;
        Ok(record.task.clone())
    }

    /// Attach a validated artifact to a non-terminal task
    pub async fn add_artifact(&self, task_id: &str, artifact: Artifact) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;

        if record.task.is_terminal() {
            return Err(A2AError::TaskTerminal {
                task_id: task_id.to_string(),
                state: record.task.state,
            });
        }
        if artifact.task_id != task_id {
            return Err(A2AError::InvalidArtifactContent(format!(
                "artifact {} belongs to task {}",
                artifact.id, artifact.task_id
            )));
        }
        artifact.validate()?;
        if !self.inner.card.produces(artifact.kind) {
            return Err(A2AError::InvalidArtifactType {
                kind: artifact.kind.to_string(),
            });
        }
        if record.task.artifacts.iter().any(|a| a.id == artifact.id) {
            return Err(A2AError::InvalidArtifactContent(format!(
                "artifact {} already attached",
                artifact.id
            )));
        }

        let at = Utc::now();
        record.task.artifacts.push(artifact.clone());
        record.task.updated_at = Some(at);
        debug!(task_id, artifact_id = %artifact.id, kind = %artifact.kind, "artifact added");
        record.emit(
            at,
            EventPayload::ArtifactAdded { artifact },
            &self.inner.observers,
        );
        Ok(record.task.clone())
    }

    /// Cancel a task
    ///
    /// Canceling a task that already reached a terminal state is a no-op that returns it
    /// unchanged and emits nothing.
    pub async fn cancel(&self, task_id: &str, reason: Option<String>) -> A2AResult<Task> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;
        if record.task.is_terminal() {
            debug!(task_id, state = %record.task.state, "cancel on terminal task ignored");
            return Ok(record.task.clone());
        }
        self.apply_transition(&mut record, TaskState::Canceled, reason, None, None)?;
        Ok(record.task.clone())
    }

    /// Subscribe to a task's events
    ///
    /// The first event is a snapshot of the task. A terminal task yields the snapshot and then
    /// the subscription ends.
    pub async fn subscribe(&self, task_id: &str) -> A2AResult<Subscription> {
        let entry = self.entry(task_id).await?;
        let mut record = entry.lock().await;
        if record.hub.is_closed() && !record.task.is_terminal() {
            // hubs of live tasks are only closed by shutdown
            return Err(A2AError::ShutDown);
        }

        let snapshot = TaskEvent::new(
            task_id,
            record.seq,
            EventPayload::TaskSnapshot {
                task: Box::new(record.task.clone()),
            },
        );
        let config = &self.inner.config;
        Ok(record.hub.attach(
            snapshot,
            config.subscriber_queue_capacity,
            config.delivery_timeout,
        ))
    }

    /// Number of live subscriptions to a task
    ///
    /// Subscriptions leave on their own when they are dropped, fall behind, or the task
    /// finishes.
    pub async fn subscriber_count(&self, task_id: &str) -> A2AResult<usize> {
        let entry = self.entry(task_id).await?;
        let record = entry.lock().await;
        Ok(record.hub.len())
    }

    /// Stop delivery to a subscription; safe to call more than once
    pub async fn unsubscribe(&self, subscription: &mut Subscription) {
        let entry = self
            .inner
            .tasks
            .read()
            .await
            .get(subscription.task_id())
            .cloned();
        if let Some(entry) = entry {
            entry.lock().await.hub.detach(subscription.id());
        }
        subscription.close();
    }

    /// Feed of every event of every task, for workers and audit
    ///
    /// Observers that fall behind miss events rather than slowing the manager down.
    pub fn observe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.observers.subscribe()
    }

    /// Reject further operations and end every open subscription
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let entries: Vec<_> = self.inner.tasks.read().await.values().cloned().collect();
        let mut subscribers = 0;
        for entry in entries {
            let mut record = entry.lock().await;
            subscribers += record.hub.len();
            record.hub.close();
        }
        info!(subscribers, "task manager shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) was called
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> A2AResult<()> {
        if self.is_shut_down() {
            return Err(A2AError::ShutDown);
        }
        Ok(())
    }

    async fn entry(&self, task_id: &str) -> A2AResult<Arc<Mutex<TaskRecord>>> {
        self.ensure_running()?;
        self.inner
            .tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| A2AError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    fn apply_transition(
        &self,
        record: &mut TaskRecord,
        to: TaskState,
        reason: Option<String>,
        input: Option<Value>,
        error: Option<TaskError>,
    ) -> A2AResult<()> {
        let from = record.task.state;
        if !from.can_transition_to(to) {
            warn!(task_id = %record.task.id, %from, %to, "rejected illegal transition");
            return Err(A2AError::InvalidTransition {
                task_id: record.task.id.clone(),
                from,
                to,
            });
        }

        let at = Utc::now();
        record.task.record_transition(to, reason.clone(), at);
        if let Some(input) = &input {
            record.task.inputs.push(input.clone());
        }
        if let Some(error) = &error {
            record.task.error = Some(error.clone());
        }
        info!(task_id = %record.task.id, %from, %to, "task state changed");

        record.emit(
            at,
            EventPayload::StateChanged {
                from,
                to,
                reason,
                input,
                error,
            },
            &self.inner.observers,
        );
        if to.is_terminal() {
            record.hub.close();
        }
        Ok(())
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("agent", &self.inner.card.name)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
