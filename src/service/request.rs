//! A2A service request types

use std::{collections::HashMap, time::Duration};

use uuid::Uuid;

use crate::protocol::A2AOperation;

/// Header carrying [`RequestContext::request_id`]
pub const REQUEST_ID_HEADER: &str = "A2A-Request-Id";

/// An operation bound for one agent, plus how to send it
#[derive(Debug, Clone)]
pub struct A2ARequest {
    pub operation: A2AOperation,
    pub context: RequestContext,
}

impl A2ARequest {
    /// Create a new A2A request
    pub fn new(operation: A2AOperation, context: RequestContext) -> Self {
        Self { operation, context }
    }
}

/// Per-call settings that travel with a request through the layers
///
/// The request ID is fixed when the context is created, so every retry of a call and every
/// reconnect of a task stream carries the same ID.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Base URL of the target agent
    pub agent_url: String,

    /// Correlates client and agent logs for one logical call
    pub request_id: String,

    /// Request timeout
    ///
    /// For streaming operations this bounds establishing the stream, not its lifetime.
    pub timeout: Option<Duration>,

    /// Extra headers sent with the request
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reuse an ID minted elsewhere, e.g. by an inbound request being forwarded
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            agent_url: String::new(),
            request_id: Uuid::now_v7().to_string(),
            timeout: Some(Duration::from_secs(30)),
            headers: HashMap::new(),
        }
    }
}
