//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each registered instance
//!     → InstanceRegistry::record
//!
//! Passive health checks (client/http.rs):
//!     Call outcome observed
//!     → ServiceLocator::report
//!     → InstanceRegistry::record
//! ```
//!
//! # Design Decisions
//! - Active and passive checks feed the same hysteresis
//! - State transitions require consecutive successes/failures
//! - Health state is per-instance, not per-service

pub mod active;

pub use active::HealthMonitor;
