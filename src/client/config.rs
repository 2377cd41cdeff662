//! Client configuration

use std::time::Duration;

use crate::layer::RetryPolicy;

/// Configuration for an A2A client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the agent
    pub agent_url: String,

    /// Default request timeout
    pub timeout: Duration,

    /// Backoff for retried requests and stream reconnects
    pub retry: RetryPolicy,

    /// Reconnect attempts a task stream makes before giving up
    pub max_reconnects: u32,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_reconnects: 5,
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set how often a task stream may reconnect
    pub fn with_max_reconnects(mut self, max_reconnects: u32) -> Self {
        self.max_reconnects = max_reconnects;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}
