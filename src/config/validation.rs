//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Exactly one resolution strategy per target
//! - Breaker settings reference existing targets and are in range
//! - Role seeds are unique by id and description
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WorkloadConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{CircuitBreakerConfig, TargetConfig, WorkloadConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("target name must not be empty")]
    EmptyTargetName,

    #[error("target '{0}' is defined more than once")]
    DuplicateTarget(String),

    #[error("target '{0}' must set exactly one of `discovery` or `url`")]
    AmbiguousResolution(String),

    #[error("target '{target}' has invalid url '{url}': {reason}")]
    InvalidUrl {
        target: String,
        url: String,
        reason: String,
    },

    #[error("target '{0}' api_prefix must start with '/'")]
    InvalidPrefix(String),

    #[error("instance address '{0}' is not a valid socket address")]
    InvalidInstanceAddress(String),

    #[error("circuit breaker configured for unknown target '{0}'")]
    UnknownBreakerTarget(String),

    #[error("circuit breaker '{target}': {reason}")]
    InvalidBreaker { target: String, reason: String },

    #[error("role {0} is defined more than once")]
    DuplicateRoleId(u64),

    #[error("role description '{0}' is defined more than once")]
    DuplicateRoleDescription(String),

    #[error("role {0} has an empty description")]
    EmptyRoleDescription(u64),

    #[error("metrics address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &WorkloadConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.connect_ms == 0 {
        errors.push(zero("timeouts.connect_ms"));
    }
    if config.timeouts.request_ms == 0 {
        errors.push(zero("timeouts.request_ms"));
    }

    let mut names = HashSet::new();
    for target in &config.targets {
        if !names.insert(target.name.as_str()) {
            errors.push(ValidationError::DuplicateTarget(target.name.clone()));
        }
        validate_target(target, &mut errors);
    }

    for instance in &config.instances {
        if instance.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidInstanceAddress(instance.address.clone()));
        }
    }

    for (target, breaker) in &config.circuit_breakers {
        if !names.contains(target.as_str()) {
            errors.push(ValidationError::UnknownBreakerTarget(target.clone()));
        }
        validate_breaker(target, breaker, &mut errors);
    }

    let mut ids = HashSet::new();
    let mut descriptions = HashSet::new();
    for role in &config.roles {
        if !ids.insert(role.id) {
            errors.push(ValidationError::DuplicateRoleId(role.id));
        }
        if role.description.trim().is_empty() {
            errors.push(ValidationError::EmptyRoleDescription(role.id));
        } else if !descriptions.insert(role.description.as_str()) {
            errors.push(ValidationError::DuplicateRoleDescription(role.description.clone()));
        }
    }

    let health = &config.health_check;
    if health.enabled {
        if health.interval_secs == 0 {
            errors.push(zero("health_check.interval_secs"));
        }
        if health.timeout_secs == 0 {
            errors.push(zero("health_check.timeout_secs"));
        }
    }
    if health.unhealthy_threshold == 0 {
        errors.push(zero("health_check.unhealthy_threshold"));
    }
    if health.healthy_threshold == 0 {
        errors.push(zero("health_check.healthy_threshold"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_target(target: &TargetConfig, errors: &mut Vec<ValidationError>) {
    if target.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTargetName);
    }

    match (&target.discovery, &target.url) {
        (Some(service), None) => {
            if service.trim().is_empty() {
                errors.push(ValidationError::AmbiguousResolution(target.name.clone()));
            }
            if !target.api_prefix.is_empty() && !target.api_prefix.starts_with('/') {
                errors.push(ValidationError::InvalidPrefix(target.name.clone()));
            }
        }
        (None, Some(url)) => {
            let reason = match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
                Ok(parsed) => Some(format!("unsupported scheme '{}'", parsed.scheme())),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = reason {
                errors.push(ValidationError::InvalidUrl {
                    target: target.name.clone(),
                    url: url.clone(),
                    reason,
                });
            }
        }
        _ => errors.push(ValidationError::AmbiguousResolution(target.name.clone())),
    }

    if target.request_timeout_ms == Some(0) {
        errors.push(zero(&format!("targets.{}.request_timeout_ms", target.name)));
    }
}

fn validate_breaker(target: &str, config: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    let mut invalid = |reason: String| {
        errors.push(ValidationError::InvalidBreaker {
            target: target.to_string(),
            reason,
        })
    };

    let rate = config.failure_rate_threshold;
    if !(rate > 0.0 && rate <= 1.0) {
        invalid(format!("failure_rate_threshold {} is outside (0, 1]", rate));
    }
    if config.sliding_window_size == 0 {
        invalid("sliding_window_size must be at least 1".to_string());
    }
    if config.minimum_calls == 0 || config.minimum_calls > config.sliding_window_size {
        invalid(format!(
            "minimum_calls {} must be between 1 and sliding_window_size {}",
            config.minimum_calls, config.sliding_window_size
        ));
    }
    if config.open_state_duration_ms == 0 {
        invalid("open_state_duration_ms must be greater than zero".to_string());
    }
    if config.half_open_trial_count == 0 {
        invalid("half_open_trial_count must be at least 1".to_string());
    }
}

fn zero(field: &str) -> ValidationError {
    ValidationError::Zero {
        field: field.to_string(),
    }
}
