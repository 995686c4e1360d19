//! User workload service client library.
//!
//! Resilient remote lookups against peer services (service location, typed
//! count clients, circuit breaking) and role resolution for inbound user
//! payloads.

pub mod client;
pub mod config;
pub mod discovery;
pub mod health;
pub mod observability;
pub mod resilience;
pub mod roles;
pub mod workload;

pub use config::schema::WorkloadConfig;
pub use resilience::{CallOutcome, CircuitBreakerRegistry, CircuitState};
pub use roles::{RoleResolver, UserDto};
pub use workload::{UserWorkload, WorkloadService};
