//! Per-task event fan-out
//!
//! Every subscriber owns a bounded queue. Publishing only ever does a non-blocking push onto
//! those queues; a delivery worker per subscriber drains its queue into the subscriber's
//! channel. A subscriber whose queue is full, or who does not take an event within the
//! delivery timeout, is dropped. Neither case can block the task manager or other subscribers.
//! Dropping a [`Subscription`] stops its worker, which then removes itself from the hub.

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    task::{Context, Poll},
    time::Duration,
};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::protocol::TaskEvent;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifier of a subscription, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

/// A live handle receiving the ordered events of one task
///
/// The first event is always a `task-snapshot` of the task at subscribe time. The stream ends
/// after the task's terminal event, when the subscriber is dropped for being too slow, or when
/// the task manager shuts down.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    task_id: String,
    receiver: mpsc::Receiver<TaskEvent>,
    last_seq: Option<u64>,
    closed: bool,
}

impl Subscription {
    /// Subscription identifier
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Task this subscription follows
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Sequence number of the last event handed to the consumer
    pub fn last_delivered_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Whether the subscription was closed by the consumer
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receive the next event, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        if self.closed {
            return None;
        }
        let event = self.receiver.recv().await?;
        self.last_seq = Some(event.seq);
        Some(event)
    }

    /// Stop delivery and discard anything still buffered
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Stream for Subscription {
    type Item = TaskEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                this.last_seq = Some(event.seq);
                Poll::Ready(Some(event))
            }
            other => other,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    queue: mpsc::Sender<TaskEvent>,
}

type Members = Mutex<Vec<Subscriber>>;

fn lock(members: &Members) -> MutexGuard<'_, Vec<Subscriber>> {
    members.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribers of one task
///
/// Lives inside the task's record, so publishing is serialized with every other mutation of
/// that task and per-task order is preserved. The member list is shared with the delivery
/// workers only so that a worker can remove its own entry when its consumer goes away.
#[derive(Default)]
pub(crate) struct EventHub {
    members: Arc<Members>,
    closed: bool,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.members).len()
    }

    /// Attach a subscriber whose first event is `snapshot`
    ///
    /// When the hub is closed the subscriber receives the snapshot and then its stream ends.
    pub(crate) fn attach(
        &mut self,
        snapshot: TaskEvent,
        queue_capacity: usize,
        delivery_timeout: Duration,
    ) -> Subscription {
        let id = SubscriptionId::next();
        let task_id = snapshot.task_id.clone();
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel(1);

        // capacity is at least one, so the snapshot always fits
        let _ = queue_tx.try_send(snapshot);
        if !self.closed {
            lock(&self.members).push(Subscriber {
                id,
                queue: queue_tx,
            });
        }
        tokio::spawn(deliver(
            id,
            queue_rx,
            out_tx,
            delivery_timeout,
            Arc::downgrade(&self.members),
        ));
        debug!(task_id = %task_id, subscription = id.0, "subscriber attached");

        Subscription {
            id,
            task_id,
            receiver: out_rx,
            last_seq: None,
            closed: false,
        }
    }

    /// Remove a subscriber; no-op if it is already gone
    pub(crate) fn detach(&mut self, id: SubscriptionId) {
        lock(&self.members).retain(|sub| sub.id != id);
    }

    /// Queue `event` for every subscriber, dropping those that cannot keep up
    pub(crate) fn publish(&mut self, event: &TaskEvent) {
        lock(&self.members).retain(|sub| match sub.queue.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    task_id = %event.task_id,
                    subscription = sub.id.0,
                    seq = event.seq,
                    "subscriber queue full, dropping subscriber"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    task_id = %event.task_id,
                    subscription = sub.id.0,
                    "subscriber gone"
                );
                false
            }
        });
    }

    /// Close every subscription once its queued events are flushed
    pub(crate) fn close(&mut self) {
        self.closed = true;
        lock(&self.members).clear();
    }
}

async fn deliver(
    id: SubscriptionId,
    mut queue: mpsc::Receiver<TaskEvent>,
    out: mpsc::Sender<TaskEvent>,
    timeout: Duration,
    members: Weak<Members>,
) {
    loop {
        let event = tokio::select! {
            event = queue.recv() => event,
            () = out.closed() => {
                debug!(subscription = id.0, "subscriber disconnected");
                None
            }
        };
        let Some(event) = event else {
            break;
        };

        let seq = event.seq;
        match tokio::time::timeout(timeout, out.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                debug!(subscription = id.0, "subscriber disconnected");
                break;
            }
            Err(_) => {
                warn!(
                    subscription = id.0,
                    seq,
                    ?timeout,
                    "subscriber did not accept event in time, dropping subscriber"
                );
                break;
            }
        }
    }

    if let Some(members) = members.upgrade() {
        lock(&members).retain(|sub| sub.id != id);
    }
}
