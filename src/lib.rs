//! # A2A Taskhub
//!
//! Task protocol core for the Agent2Agent (A2A) protocol.
//!
//! An agent advertises what it can do with an [`AgentCard`](protocol::AgentCard), accepts
//! tasks through a [`TaskManager`](server::TaskManager) that enforces the task lifecycle, and
//! streams every state change and artifact to subscribers in order. Remote agents are reached
//! through [`AgentClient`](client::AgentClient), a Tower service stack that validates what it
//! receives, retries transient failures and resumes interrupted task streams.
//!
//! ## Features
//!
//! - **Strict lifecycle**: submitted → working → input-required/completed/failed/rejected,
//!   cancel from any live state, terminal states are final
//! - **Ordered fan-out**: per-task sequence numbers, snapshot on subscribe, slow subscribers
//!   dropped without stalling anyone else
//! - **Transport agnostic**: HTTP+JSON with SSE streams, or in-process
//! - **Composable middleware**: retry and validation as Tower layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use a2a_taskhub::prelude::*;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = "https://agent.example.com".parse().unwrap();
//!     let mut client = A2AClientBuilder::new_http(url).build()?;
//!
//!     let agent_card = client.discover().await?;
//!     println!("Connected to: {}", agent_card.name);
//!
//!     let handle = client.submit("echo", json!({"text": "hi"}), HashMap::new()).await?;
//!     let task = client.stream(handle.id()).into_final_task().await?;
//!     println!("{} artifacts", task.artifacts.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod layer;
pub mod protocol;
pub mod server;
pub mod service;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        client::{A2AClientBuilder, AgentClient, TaskHandle, TaskStream, TaskUpdate},
        layer::RetryPolicy,
        protocol::{
            create_artifact, validate_artifact, A2AError, A2AOperation, A2AResult, AgentCard,
            Artifact, ArtifactType, EventPayload, FileContent, Task, TaskError, TaskEvent,
            TaskState,
        },
        server::{ManagerConfig, Subscription, TaskHandler, TaskManager},
    };
}
