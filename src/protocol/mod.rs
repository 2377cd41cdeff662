//! Core A2A protocol types and definitions

pub mod agent;
pub mod artifact;
pub mod error;
pub mod event;
pub mod operation;
pub mod task;

pub use agent::{AgentCard, AgentCardBuilder, AuthRequirements, SecurityScheme};
pub use artifact::{create_artifact, validate_artifact, Artifact, ArtifactType, FileContent};
pub use error::{A2AError, A2AResult, ErrorBody, RemoteError};
pub use event::{EventPayload, TaskEvent};
pub use operation::A2AOperation;
pub use task::{
    CreateTaskRequest, StateTransition, Task, TaskError, TaskListResponse, TaskState,
};
