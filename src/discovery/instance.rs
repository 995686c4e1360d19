//! Service instance abstraction.
//!
//! # Responsibilities
//! - Represent a single registered address of a peer service
//! - Track health state (Unknown/Healthy/Unhealthy) with hysteresis
//! - Build the base URL requests are issued against

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use url::Url;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// One live (or formerly live) instance of a service.
#[derive(Debug)]
pub struct ServiceInstance {
    /// Logical service name the instance is registered under.
    pub service: String,
    /// The address of the instance.
    pub addr: SocketAddr,

    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl ServiceInstance {
    pub fn new(service: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            service: service.into(),
            addr,
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    /// `http://host:port/` for this instance.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}", self.addr))
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Return true if the instance may receive traffic (Healthy or Unknown).
    pub fn is_available(&self) -> bool {
        self.health() != HealthState::Unhealthy
    }

    /// Report a successful call or probe.
    ///
    /// Returns the new state when this report caused a transition.
    pub fn mark_success(&self, healthy_threshold: usize) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.health() == HealthState::Healthy {
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            return Some(HealthState::Healthy);
        }
        None
    }

    /// Report a failed call or probe.
    ///
    /// Returns the new state when this report caused a transition.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.health() == HealthState::Unhealthy {
            return None;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            self.consecutive_failures.store(0, Ordering::Relaxed);
            return Some(HealthState::Unhealthy);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> ServiceInstance {
        ServiceInstance::new("project-service", "10.0.0.5:8082".parse().unwrap())
    }

    #[test]
    fn test_base_url() {
        let url = instance().base_url().unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8082/");
    }

    #[test]
    fn test_hysteresis() {
        let inst = instance();
        assert_eq!(inst.health(), HealthState::Unknown);
        assert!(inst.is_available());

        assert_eq!(inst.mark_failure(2), None);
        assert_eq!(inst.mark_failure(2), Some(HealthState::Unhealthy));
        assert!(!inst.is_available());

        // A lone success is not enough to come back.
        assert_eq!(inst.mark_success(2), None);
        assert!(!inst.is_available());
        assert_eq!(inst.mark_success(2), Some(HealthState::Healthy));
        assert!(inst.is_available());
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let inst = instance();
        inst.mark_failure(3);
        inst.mark_failure(3);
        inst.mark_success(1);
        assert_eq!(inst.mark_failure(3), None);
        assert!(inst.is_available());
    }
}
