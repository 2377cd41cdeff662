//! Agent-side task core
//!
//! [`TaskManager`] owns the task registry and enforces the lifecycle; each task fans its
//! events out to [`Subscription`]s. [`TaskHandler`] exposes both over a transport binding.

pub mod config;
pub mod handler;
pub mod manager;
pub mod stream;

pub use config::ManagerConfig;
pub use handler::TaskHandler;
pub use manager::TaskManager;
pub use stream::{Subscription, SubscriptionId};
