//! Task lifecycle tests against the public task manager API

use std::{collections::HashMap, time::Duration};

use a2a_taskhub::prelude::*;
use serde_json::json;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok, assert_pending};

fn manager() -> TaskManager {
    let card = AgentCard::builder("Lifecycle Agent")
        .version("1.0.0")
        .capability("echo")
        .capability("review")
        .streaming(true)
        .build()
        .unwrap();
    TaskManager::new(card)
}

async fn next_event(subscription: &mut Subscription) -> TaskEvent {
    timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("event in time")
        .expect("subscription open")
}

#[tokio::test]
async fn test_echo_task_end_to_end() {
    let manager = manager();

    let task = manager
        .create_task("echo", json!({"text": "hi"}), HashMap::new())
        .await
        .unwrap();
    assert_eq!(task.state, TaskState::Submitted);

    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();

    let artifact = create_artifact("text", json!("hi"), &task.id).unwrap();
    let updated = manager.add_artifact(&task.id, artifact).await.unwrap();
    assert_eq!(updated.artifacts.len(), 1);

    let done = manager
        .transition(&task.id, TaskState::Completed, None)
        .await
        .unwrap();
    assert_eq!(done.state, TaskState::Completed);

    let late = create_artifact("text", json!("late"), &task.id).unwrap();
    let err = assert_err!(manager.add_artifact(&task.id, late).await);
    assert!(matches!(
        err,
        A2AError::TaskTerminal {
            state: TaskState::Completed,
            ..
        }
    ));
    assert_eq!(manager.get_task(&task.id).await.unwrap().artifacts.len(), 1);
}

#[tokio::test]
async fn test_input_round_trip() {
    let manager = manager();
    let task = manager
        .create_task("review", json!({"doc": "draft"}), HashMap::new())
        .await
        .unwrap();

    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();
    manager
        .transition(
            &task.id,
            TaskState::InputRequired,
            Some("need approval".into()),
        )
        .await
        .unwrap();

    let resumed = assert_ok!(
        manager
            .provide_input(&task.id, json!({"approved": true}))
            .await
    );
    assert_eq!(resumed.state, TaskState::Working);
    assert_eq!(resumed.inputs, vec![json!({"approved": true})]);

    let states: Vec<_> = resumed.history.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            TaskState::Working,
            TaskState::InputRequired,
            TaskState::Working
        ]
    );
}

#[tokio::test]
async fn test_unknown_artifact_type_leaves_task_unchanged() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();

    let err = create_artifact("unknown-kind", json!("x"), &task.id).unwrap_err();
    assert!(matches!(err, A2AError::InvalidArtifactType { kind } if kind == "unknown-kind"));
    assert!(manager.get_task(&task.id).await.unwrap().artifacts.is_empty());
}

#[tokio::test]
async fn test_artifacts_kept_in_addition_order() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();

    let mut ids = Vec::new();
    for n in 0..5 {
        let artifact = create_artifact("data", json!({ "n": n }), &task.id).unwrap();
        ids.push(artifact.id.clone());
        manager.add_artifact(&task.id, artifact).await.unwrap();
    }

    let stored: Vec<_> = manager
        .get_task(&task.id)
        .await
        .unwrap()
        .artifacts
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(stored, ids);
}

#[tokio::test]
async fn test_concurrent_cancels_emit_one_event() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();
    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();

    let mut feed = manager.observe();

    let first = {
        let manager = manager.clone();
        let id = task.id.clone();
        tokio::spawn(async move { manager.cancel(&id, Some("user".into())).await })
    };
    let second = {
        let manager = manager.clone();
        let id = task.id.clone();
        tokio::spawn(async move { manager.cancel(&id, Some("timeout".into())).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.state, TaskState::Canceled);
    assert_eq!(second.state, TaskState::Canceled);

    let mut canceled = 0;
    while let Ok(event) = feed.try_recv() {
        if let EventPayload::StateChanged {
            to: TaskState::Canceled,
            ..
        } = event.payload
        {
            canceled += 1;
        }
    }
    assert_eq!(canceled, 1);

    let history = manager.get_task(&task.id).await.unwrap().history;
    assert_eq!(
        history
            .iter()
            .filter(|t| t.to == TaskState::Canceled)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_racing_transitions_are_serialized() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();
    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();

    let complete = {
        let manager = manager.clone();
        let id = task.id.clone();
        tokio::spawn(async move { manager.transition(&id, TaskState::Completed, None).await })
    };
    let fail = {
        let manager = manager.clone();
        let id = task.id.clone();
        tokio::spawn(async move {
            manager
                .fail(&id, TaskError::new("CRASH", "worker died"))
                .await
        })
    };

    let results = [complete.await.unwrap(), fail.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(A2AError::InvalidTransition { .. }))));

    let task = manager.get_task(&task.id).await.unwrap();
    assert!(task.is_terminal());
    assert_eq!(task.history.len(), 2);
}

#[tokio::test]
async fn test_subscriber_sees_live_events_in_order() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();

    let mut subscription = manager.subscribe(&task.id).await.unwrap();
    let snapshot = next_event(&mut subscription).await;
    assert!(snapshot.is_snapshot());
    assert_eq!(snapshot.seq, 1);
    {
        let mut idle = tokio_test::task::spawn(subscription.recv());
        assert_pending!(idle.poll());
    }

    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();
    let artifact = create_artifact("text", json!("out"), &task.id).unwrap();
    manager.add_artifact(&task.id, artifact).await.unwrap();
    manager
        .transition(&task.id, TaskState::Completed, None)
        .await
        .unwrap();

    let names: Vec<_> = [
        next_event(&mut subscription).await,
        next_event(&mut subscription).await,
        next_event(&mut subscription).await,
    ]
    .iter()
    .map(|e| (e.seq, e.name()))
    .collect();
    assert_eq!(
        names,
        vec![
            (2, "state-changed"),
            (3, "artifact-added"),
            (4, "state-changed")
        ]
    );

    // terminal event closes the subscription
    let end = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_late_subscriber_gets_terminal_snapshot_only() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();
    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();
    manager
        .transition(&task.id, TaskState::Completed, None)
        .await
        .unwrap();

    let mut subscription = manager.subscribe(&task.id).await.unwrap();
    let snapshot = next_event(&mut subscription).await;
    match snapshot.payload {
        EventPayload::TaskSnapshot { task } => assert_eq!(task.state, TaskState::Completed),
        other => panic!("expected snapshot, got {other:?}"),
    }

    let end = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_slow_subscriber_does_not_stall_progress() {
    let card = AgentCard::builder("Lifecycle Agent")
        .capability("echo")
        .build()
        .unwrap();
    let config = ManagerConfig::new()
        .with_subscriber_queue_capacity(1)
        .with_delivery_timeout(Duration::from_millis(10));
    let manager = TaskManager::with_config(card, config);

    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();
    let mut slow = manager.subscribe(&task.id).await.unwrap();
    let mut fast = manager.subscribe(&task.id).await.unwrap();
    next_event(&mut fast).await;

    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();
    next_event(&mut fast).await;
    for n in 0..20 {
        let artifact = create_artifact("data", json!({ "n": n }), &task.id).unwrap();
        manager.add_artifact(&task.id, artifact).await.unwrap();
        // fast consumer keeps up
        assert_eq!(next_event(&mut fast).await.name(), "artifact-added");
    }

    let done = timeout(
        Duration::from_secs(1),
        manager.transition(&task.id, TaskState::Completed, None),
    )
    .await
    .expect("manager not blocked by slow subscriber")
    .unwrap();
    assert_eq!(done.state, TaskState::Completed);

    // the slow subscriber was dropped: it drains what it got and ends early
    let mut received = Vec::new();
    while let Ok(Some(event)) = timeout(Duration::from_secs(1), slow.recv()).await {
        received.push(event.seq);
    }
    assert!(received.len() < 23);
    assert!(received.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();

    let mut subscription = manager.subscribe(&task.id).await.unwrap();
    manager.unsubscribe(&mut subscription).await;
    manager.unsubscribe(&mut subscription).await;
    assert!(subscription.is_closed());

    manager
        .transition(&task.id, TaskState::Working, None)
        .await
        .unwrap();
    assert!(subscription.recv().await.is_none());
}

#[tokio::test]
async fn test_subscribe_unknown_task() {
    let manager = manager();
    let err = manager.subscribe("missing").await.unwrap_err();
    assert!(matches!(err, A2AError::TaskNotFound { task_id } if task_id == "missing"));
}

#[tokio::test]
async fn test_shutdown_closes_subscriptions() {
    let manager = manager();
    let task = manager
        .create_task("echo", json!(null), HashMap::new())
        .await
        .unwrap();
    let mut subscription = manager.subscribe(&task.id).await.unwrap();
    next_event(&mut subscription).await;

    manager.shutdown().await;

    let end = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap();
    assert!(end.is_none());
    assert!(matches!(
        manager
            .create_task("echo", json!(null), HashMap::new())
            .await,
        Err(A2AError::ShutDown)
    ));
    assert!(matches!(
        manager.subscribe(&task.id).await,
        Err(A2AError::ShutDown)
    ));
}
