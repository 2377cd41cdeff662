//! Tower Layer implementations for A2A protocol

pub mod retry;
pub mod validation;

pub use retry::{RetryLayer, RetryPolicy, RetryService, TransientRetry};
pub use validation::{A2AValidationLayer, A2AValidationService};
