//! Task manager configuration

use std::time::Duration;

/// Configuration for a [`TaskManager`](super::TaskManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Events buffered per subscriber before it is considered too slow and dropped
    pub subscriber_queue_capacity: usize,

    /// How long a subscriber may take to accept one event before it is dropped
    pub delivery_timeout: Duration,

    /// Events buffered for each observer before it starts lagging
    pub observer_capacity: usize,
}

impl ManagerConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            subscriber_queue_capacity: 64,
            delivery_timeout: Duration::from_secs(5),
            observer_capacity: 256,
        }
    }

    /// Set the per-subscriber queue capacity (at least 1)
    pub fn with_subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }

    /// Set the per-event delivery timeout
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the observer buffer capacity (at least 1)
    pub fn with_observer_capacity(mut self, capacity: usize) -> Self {
        self.observer_capacity = capacity.max(1);
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}
