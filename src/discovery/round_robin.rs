//! Round-robin instance selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::discovery::{instance::ServiceInstance, InstanceSelector};

/// Round-robin selector.
/// Stores an internal counter to rotate through instances.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstanceSelector for RoundRobin {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        if instances.is_empty() {
            return None;
        }

        // Bounded scan so an all-unhealthy group terminates.
        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = instances.len();

        (0..len)
            .map(|i| &instances[(start + i) % len])
            .find(|instance| instance.is_available())
            .cloned()
    }
}
