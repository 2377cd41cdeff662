//! High-level client API for A2A protocol

pub mod agent;
pub mod builder;
pub mod config;
pub mod stream;

pub use agent::{AgentClient, TaskHandle};
pub use builder::{A2AClientBuilder, ClientService};
pub use config::ClientConfig;
pub use stream::{TaskStream, TaskUpdate};
