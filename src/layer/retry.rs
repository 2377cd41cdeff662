//! Retry policy with exponential backoff for transient remote failures
//!
//! Retries run on [`tower::retry::Retry`]; [`TransientRetry`] decides which failures are
//! worth another attempt and how long to wait before it.

use std::time::Duration;

use tower::retry::{Policy, Retry};
use tower_layer::Layer;
use tracing::warn;

use crate::{
    protocol::A2AError,
    service::{A2ARequest, A2AResponse},
};

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,

    /// Factor applied to the delay after each retry
    pub multiplier: u32,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the total number of attempts (at least 1)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the first delay and the delay ceiling
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

/// Per-call retry state for [`tower::retry::Retry`]
///
/// Only transient remote failures of single-response operations are retried. Streaming
/// operations are never cloned for a retry; the task stream handles its own reconnects.
#[derive(Clone, Debug)]
pub struct TransientRetry {
    policy: RetryPolicy,
    attempt: u32,
}

impl TransientRetry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }
}

impl Policy<A2ARequest, A2AResponse, A2AError> for TransientRetry {
    type Future = tokio::time::Sleep;

    fn retry(
        &mut self,
        req: &mut A2ARequest,
        result: &mut Result<A2AResponse, A2AError>,
    ) -> Option<Self::Future> {
        let err = result.as_ref().err()?;
        if !err.is_transient() || self.attempt + 1 >= self.policy.max_attempts {
            return None;
        }

        let delay = self.policy.backoff(self.attempt);
        self.attempt += 1;
        warn!(
            attempt = self.attempt,
            max_attempts = self.policy.max_attempts,
            ?delay,
            endpoint = %req.operation.endpoint(),
            request_id = %req.context.request_id,
            error = %err,
            "transient failure, retrying"
        );
        Some(tokio::time::sleep(delay))
    }

    fn clone_request(&mut self, req: &A2ARequest) -> Option<A2ARequest> {
        (!req.operation.is_streaming()).then(|| req.clone())
    }
}

/// Service produced by [`RetryLayer`]
pub type RetryService<S> = Retry<TransientRetry, S>;

/// Layer that retries transient failures according to a [`RetryPolicy`]
#[derive(Clone, Debug, Default)]
pub struct RetryLayer {
    policy: RetryPolicy,
}

impl RetryLayer {
    /// Create a retry layer with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry::new(TransientRetry::new(self.policy.clone()), inner)
    }
}
