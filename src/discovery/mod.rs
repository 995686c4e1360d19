//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Logical service name (e.g. "project-service")
//!     → ServiceLocator::resolve
//!     → registry.rs (instances registered under the name)
//!     → round_robin.rs (rotate through live instances)
//!     → instance.rs (address + health state)
//!     → base URL for the typed client
//! ```
//!
//! # Design Decisions
//! - The locator is a trait; the client never knows where instances come from
//! - Unhealthy instances are excluded from selection
//! - Health is fed both by the active monitor and by passive call outcomes

pub mod instance;
pub mod registry;
pub mod round_robin;

use std::sync::Arc;

use thiserror::Error;

pub use instance::{HealthState, ServiceInstance};
pub use registry::InstanceRegistry;

/// Errors returned by a service locator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// Resolution was asked for an empty service name.
    #[error("service name must not be empty")]
    EmptyName,

    /// The registry holds no live instance for the service.
    #[error("no live instance of '{service}'")]
    ServiceUnavailable { service: String },
}

/// Resolves a logical service name to a reachable instance.
pub trait ServiceLocator: Send + Sync {
    fn resolve(&self, service: &str) -> Result<Arc<ServiceInstance>, LocatorError>;

    /// Feed the outcome of a call back to the locator.
    fn report(&self, _instance: &ServiceInstance, _healthy: bool) {}
}

/// Strategy picking one instance out of a service group.
pub trait InstanceSelector: Send + Sync {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>>;
}
