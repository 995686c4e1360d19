//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WorkloadConfig (validated, immutable)
//!     → shared by reference with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; target resolution never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, FallbackStrategy, HealthCheckConfig, InstanceConfig,
    ObservabilityConfig, RoleConfig, TargetConfig, TimeoutConfig, WorkloadConfig,
};
