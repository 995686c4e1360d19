//! In-process instance registry.
//!
//! # Responsibilities
//! - Hold the registered instances of each peer service
//! - Resolve a service name to one live instance (round-robin)
//! - Fold passive health reports into instance state

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::{HealthCheckConfig, InstanceConfig};
use crate::discovery::{
    instance::{HealthState, ServiceInstance},
    round_robin::RoundRobin,
    InstanceSelector, LocatorError, ServiceLocator,
};
use crate::observability::metrics;

struct ServiceGroup {
    instances: Vec<Arc<ServiceInstance>>,
    selector: Box<dyn InstanceSelector>,
}

/// Instances grouped by service name.
pub struct InstanceRegistry {
    groups: HashMap<String, ServiceGroup>,
    healthy_threshold: usize,
    unhealthy_threshold: usize,
}

impl InstanceRegistry {
    /// Build the registry from configuration.
    ///
    /// Unparseable addresses are skipped with a warning; validation rejects
    /// them before this point in normal startup.
    pub fn new(configs: &[InstanceConfig], health: &HealthCheckConfig) -> Self {
        let mut grouped: HashMap<String, Vec<Arc<ServiceInstance>>> = HashMap::new();
        for config in configs {
            match config.address.parse::<SocketAddr>() {
                Ok(addr) => grouped
                    .entry(config.service.clone())
                    .or_default()
                    .push(Arc::new(ServiceInstance::new(config.service.clone(), addr))),
                Err(_) => {
                    tracing::warn!(service = %config.service, address = %config.address, "Invalid instance address");
                }
            }
        }

        let groups = grouped
            .into_iter()
            .map(|(name, instances)| {
                let group = ServiceGroup {
                    instances,
                    selector: Box::new(RoundRobin::new()),
                };
                (name, group)
            })
            .collect();

        Self {
            groups,
            healthy_threshold: health.healthy_threshold as usize,
            unhealthy_threshold: health.unhealthy_threshold as usize,
        }
    }

    /// Return a list of all instances (for health checking).
    pub fn all_instances(&self) -> Vec<Arc<ServiceInstance>> {
        self.groups
            .values()
            .flat_map(|group| group.instances.iter())
            .cloned()
            .collect()
    }

    /// Instances registered under one service name.
    pub fn instances(&self, service: &str) -> &[Arc<ServiceInstance>] {
        self.groups
            .get(service)
            .map(|group| group.instances.as_slice())
            .unwrap_or(&[])
    }

    /// Apply one health observation to an instance.
    pub fn record(&self, instance: &ServiceInstance, healthy: bool) {
        let transition = if healthy {
            instance.mark_success(self.healthy_threshold)
        } else {
            instance.mark_failure(self.unhealthy_threshold)
        };

        if let Some(state) = transition {
            match state {
                HealthState::Unhealthy => tracing::warn!(
                    service = %instance.service,
                    addr = %instance.addr,
                    "Instance marked unhealthy"
                ),
                _ => tracing::info!(
                    service = %instance.service,
                    addr = %instance.addr,
                    "Instance marked healthy"
                ),
            }
        }
        metrics::record_instance_health(&instance.service, &instance.addr.to_string(), instance.is_available());
    }
}

impl InstanceRegistry {
    fn is_last_available(&self, instance: &ServiceInstance) -> bool {
        self.instances(&instance.service)
            .iter()
            .filter(|other| other.is_available())
            .all(|other| std::ptr::eq(other.as_ref(), instance))
    }
}

impl ServiceLocator for InstanceRegistry {
    fn resolve(&self, service: &str) -> Result<Arc<ServiceInstance>, LocatorError> {
        if service.is_empty() {
            return Err(LocatorError::EmptyName);
        }

        let Some(group) = self.groups.get(service) else {
            tracing::debug!(service = %service, "Service not registered");
            return Err(LocatorError::ServiceUnavailable {
                service: service.to_string(),
            });
        };

        group.selector.select(&group.instances).ok_or_else(|| {
            tracing::debug!(service = %service, instance_count = group.instances.len(), "No live instances");
            LocatorError::ServiceUnavailable {
                service: service.to_string(),
            }
        })
    }

    /// Passive failures never take the last available instance of a service
    /// out of rotation; only active probes can.
    fn report(&self, instance: &ServiceInstance, healthy: bool) {
        if !healthy && self.is_last_available(instance) {
            tracing::debug!(
                service = %instance.service,
                addr = %instance.addr,
                "Keeping last available instance in rotation"
            );
            return;
        }
        self.record(instance, healthy);
    }
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .groups
            .iter()
            .map(|(name, group)| (name.as_str(), group.instances.len()))
            .collect();
        f.debug_struct("InstanceRegistry")
            .field("services", &counts)
            .finish()
    }
}
