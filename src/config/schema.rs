//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the workload
//! client. All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Outbound HTTP timeouts.
    pub timeouts: TimeoutConfig,

    /// Peer services the client talks to.
    pub targets: Vec<TargetConfig>,

    /// Registered instances for discovery-resolved targets.
    pub instances: Vec<InstanceConfig>,

    /// Circuit breaker settings keyed by target name.
    pub circuit_breakers: HashMap<String, CircuitBreakerConfig>,

    /// Roles known to the role repository.
    pub roles: Vec<RoleConfig>,

    /// Active health checks against registered instances.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            targets: vec![
                TargetConfig::discovery("project-service", "/api/v1/project"),
                TargetConfig::discovery("task-service", "/api/v1/task"),
            ],
            instances: Vec::new(),
            circuit_breakers: HashMap::new(),
            roles: vec![
                RoleConfig::new(1, "Admin"),
                RoleConfig::new(2, "Manager"),
                RoleConfig::new(3, "Employee"),
            ],
            health_check: HealthCheckConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl WorkloadConfig {
    /// Breaker settings for a target, falling back to defaults.
    pub fn circuit_breaker_for(&self, target: &str) -> CircuitBreakerConfig {
        self.circuit_breakers
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    /// Look up a target by logical name.
    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Total request timeout in milliseconds.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 1_000,
            request_ms: 3_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

/// A peer service target.
///
/// Exactly one of `discovery` and `url` must be set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Logical name used for breakers, metrics and logs.
    pub name: String,

    /// Service name to resolve through the instance registry.
    #[serde(default)]
    pub discovery: Option<String>,

    /// Static base URL, already carrying any API prefix.
    #[serde(default)]
    pub url: Option<String>,

    /// Path prefix appended to discovered addresses (e.g. "/api/v1/project").
    #[serde(default)]
    pub api_prefix: String,

    /// Overrides `timeouts.request_ms` for this target.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl TargetConfig {
    pub fn discovery(name: &str, api_prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            discovery: Some(name.to_string()),
            url: None,
            api_prefix: api_prefix.to_string(),
            request_timeout_ms: None,
        }
    }

    pub fn fixed(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            discovery: None,
            url: Some(url.to_string()),
            api_prefix: String::new(),
            request_timeout_ms: None,
        }
    }
}

/// A registered service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Service name this instance belongs to.
    pub service: String,

    /// Instance address (e.g., "10.0.0.5:8082").
    pub address: String,
}

/// What the breaker hands back when it short-circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Substitute the caller-supplied fallback value.
    #[default]
    FallbackValue,
    /// Fail with `CircuitOpen`.
    Error,
}

/// Circuit breaker settings for one target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure ratio (0.0, 1.0] at or above which the circuit opens.
    pub failure_rate_threshold: f64,

    /// Number of most recent outcomes kept in the sliding window.
    pub sliding_window_size: usize,

    /// Outcomes required in the window before the ratio is evaluated.
    pub minimum_calls: usize,

    /// How long the circuit stays open before admitting trials.
    pub open_state_duration_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_trial_count: u32,

    /// Behaviour when a call is short-circuited.
    pub fallback_strategy: FallbackStrategy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 5,
            open_state_duration_ms: 10_000,
            half_open_trial_count: 1,
            fallback_strategy: FallbackStrategy::FallbackValue,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn open_state_duration(&self) -> Duration {
        Duration::from_millis(self.open_state_duration_ms)
    }
}

/// A role seeded into the role repository.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoleConfig {
    pub id: u64,
    pub description: String,
}

impl RoleConfig {
    pub fn new(id: u64, description: &str) -> Self {
        Self {
            id,
            description: description.to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each instance.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 2,
            path: "/actuator/health".to_string(),
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
