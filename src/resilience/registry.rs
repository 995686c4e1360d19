//! Breakers keyed by target name.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;

use crate::client::ClientResult;
use crate::config::{CircuitBreakerConfig, WorkloadConfig};
use crate::resilience::{BreakerError, CircuitBreaker, CircuitSnapshot};

/// Process-wide set of circuit breakers, one per target.
///
/// Breakers are created up front for every configured target; a name seen
/// for the first time at call time gets one with the default settings.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config,
        }
    }

    pub fn from_config(config: &WorkloadConfig) -> Self {
        let registry = Self::new(CircuitBreakerConfig::default());
        for target in &config.targets {
            let breaker = CircuitBreaker::new(&target.name, config.circuit_breaker_for(&target.name));
            registry.breakers.insert(target.name.clone(), Arc::new(breaker));
        }
        registry
    }

    /// Breaker guarding `target`.
    pub fn breaker(&self, target: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(target) {
            return existing.clone();
        }
        self.breakers
            .entry(target.to_string())
            .or_insert_with(|| {
                tracing::debug!(target_service = %target, "Creating circuit breaker with default settings");
                Arc::new(CircuitBreaker::new(target, self.default_config.clone()))
            })
            .clone()
    }

    /// Run `op` through the breaker for `target`.
    pub async fn execute<T, F, Fut>(&self, target: &str, op: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        self.breaker(target).execute(op).await
    }

    /// Snapshots of every breaker, sorted by target name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let mut all: Vec<_> = self.breakers.iter().map(|entry| entry.value().snapshot()).collect();
        all.sort_by(|a, b| a.target.cmp(&b.target));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::config::FallbackStrategy;
    use crate::resilience::CircuitState;

    #[test]
    fn test_configured_targets_get_their_settings() {
        let mut config = WorkloadConfig::default();
        let mut strict = CircuitBreakerConfig::default();
        strict.fallback_strategy = FallbackStrategy::Error;
        config.circuit_breakers.insert("task-service".into(), strict);

        let registry = CircuitBreakerRegistry::from_config(&config);
        assert_eq!(registry.snapshots().len(), 2);
        assert_eq!(
            registry.breaker("task-service").config().fallback_strategy,
            FallbackStrategy::Error
        );
        assert_eq!(
            registry.breaker("project-service").config().fallback_strategy,
            FallbackStrategy::FallbackValue
        );
    }

    #[test]
    fn test_same_breaker_per_name() {
        let registry = CircuitBreakerRegistry::default();
        let a = registry.breaker("billing-service");
        let b = registry.breaker("billing-service");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_breakers_are_independent() {
        let registry = CircuitBreakerRegistry::new(CircuitBreakerConfig {
            sliding_window_size: 1,
            minimum_calls: 1,
            ..CircuitBreakerConfig::default()
        });

        let failed: Result<u32, _> = registry
            .execute("project-service", || async {
                Err(ClientError::Unreachable {
                    target: "project-service".into(),
                    reason: "refused".into(),
                })
            })
            .await;
        assert!(failed.is_err());

        assert_eq!(registry.breaker("project-service").state(), CircuitState::Open);
        assert_eq!(registry.execute("task-service", || async { Ok(2u32) }).await, Ok(2));
        assert_eq!(registry.breaker("task-service").state(), CircuitState::Closed);
    }
}
