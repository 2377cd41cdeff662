//! In-process echo agent
//!
//! Runs a task manager with a worker that echoes every task's input back as an artifact, then
//! drives it through the client over the local transport and prints each streamed update.
//!
//! ```sh
//! RUST_LOG=a2a_taskhub=debug cargo run --example echo_agent
//! ```

use std::{collections::HashMap, time::Duration};

use a2a_taskhub::prelude::*;
use anyhow::Context;
use futures::StreamExt;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pick up new tasks from the observer feed and run them to completion
async fn run_worker(manager: TaskManager) {
    let mut feed = manager.observe();
    while let Ok(event) = feed.recv().await {
        let EventPayload::TaskCreated { task } = event.payload else {
            continue;
        };
        if let Err(err) = echo(&manager, &task).await {
            warn!(task_id = %task.id, error = %err, "echo failed");
            let _ = manager
                .fail(&task.id, TaskError::new("ECHO_FAILED", err.to_string()))
                .await;
        }
    }
}

async fn echo(manager: &TaskManager, task: &Task) -> Result<(), A2AError> {
    manager
        .transition(&task.id, TaskState::Working, Some("echoing".into()))
        .await?;

    let text = task.input["text"]
        .as_str()
        .ok_or_else(|| A2AError::Validation("input.text must be a string".into()))?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let artifact = create_artifact("text", json!(text), &task.id)?;
    manager.add_artifact(&task.id, artifact).await?;
    manager
        .transition(&task.id, TaskState::Completed, None)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let card = AgentCard::builder("Echo Agent")
        .version("1.0.0")
        .description("Echoes its input back as a text artifact")
        .capability("echo")
        .streaming(true)
        .artifact_types([ArtifactType::Text])
        .build()?;
    let manager = TaskManager::new(card);
    let worker = tokio::spawn(run_worker(manager.clone()));

    let url = "local://echo-agent"
        .parse::<url::Url>()
        .context("agent url")?;
    let mut client = A2AClientBuilder::new_local(url, TaskHandler::new(manager.clone()))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    let agent = client.discover().await?;
    println!("Connected to: {} v{}", agent.name, agent.version);
    println!("  Capabilities: {}", agent.capabilities.join(", "));
    println!();

    for text in ["hello", "agent to agent"] {
        let handle = client
            .submit("echo", json!({ "text": text }), HashMap::new())
            .await?;
        println!("Submitted task {}", handle.id());

        let mut updates = client.stream(handle.id());
        while let Some(update) = updates.next().await {
            let update = update?;
            println!(
                "  [{}] {:<15} state={}",
                update.event.seq,
                update.event.name(),
                update.task.state
            );
            if update.task.is_terminal() {
                for artifact in &update.task.artifacts {
                    println!("  artifact {}: {:?}", artifact.kind, artifact.text());
                }
            }
        }
        println!();
    }

    match client.submit("paint", json!({}), HashMap::new()).await {
        Err(err @ A2AError::UnsupportedTaskKind { .. }) => println!("Rejected as expected: {err}"),
        other => anyhow::bail!("unexpected result for unsupported kind: {other:?}"),
    }

    let tasks = client.list_tasks(Some(TaskState::Completed), None).await?;
    info!(completed = tasks.len(), "done");

    manager.shutdown().await;
    worker.abort();
    Ok(())
}
