//! Metrics collection and exposition.
//!
//! # Metrics
//! - `user_workload_remote_calls_total` (counter): outbound calls by target, outcome
//! - `user_workload_remote_call_duration_seconds` (histogram): outbound latency
//! - `user_workload_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `user_workload_short_circuits_total` (counter): calls rejected by an open circuit
//! - `user_workload_instance_health` (gauge): 1=available, 0=unhealthy
//! - `user_workload_role_lookups_total` (counter): role resolutions by outcome
//!
//! Without an installed recorder every macro is a no-op, so library code
//! records unconditionally.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one outbound call.
pub fn record_remote_call(target: &str, outcome: &'static str, start: Instant) {
    counter!(
        "user_workload_remote_calls_total",
        "target" => target.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "user_workload_remote_call_duration_seconds",
        "target" => target.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_state(target: &str, state: CircuitState) {
    gauge!("user_workload_circuit_state", "target" => target.to_string()).set(state as u8 as f64);
}

pub fn record_short_circuit(target: &str) {
    counter!("user_workload_short_circuits_total", "target" => target.to_string()).increment(1);
}

pub fn record_instance_health(service: &str, addr: &str, healthy: bool) {
    gauge!(
        "user_workload_instance_health",
        "service" => service.to_string(),
        "addr" => addr.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_role_lookup(outcome: &'static str) {
    counter!("user_workload_role_lookups_total", "outcome" => outcome).increment(1);
}
