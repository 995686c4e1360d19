//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered instance
//! - Feed probe results into the registry's health hysteresis

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::discovery::{InstanceRegistry, ServiceInstance};

pub struct HealthMonitor {
    registry: Arc<InstanceRegistry>,
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(registry: Arc<InstanceRegistry>, config: HealthCheckConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("user-workload-health-check")
            .build()?;

        Ok(Self {
            registry,
            config,
            client,
        })
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every instance once, concurrently.
    pub async fn check_all(&self) {
        let instances = self.registry.all_instances();
        let probes = instances.iter().map(|instance| async move {
            let healthy = self.probe(instance).await;
            self.registry.record(instance, healthy);
        });
        join_all(probes).await;
    }

    async fn probe(&self, instance: &ServiceInstance) -> bool {
        let url = format!("http://{}{}", instance.addr, self.config.path);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    service = %instance.service,
                    addr = %instance.addr,
                    status = %response.status(),
                    "Health check failed: non-success status"
                );
                false
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(service = %instance.service, addr = %instance.addr, "Health check failed: timeout");
                false
            }
            Err(e) => {
                tracing::warn!(
                    service = %instance.service,
                    addr = %instance.addr,
                    error = %e,
                    "Health check failed: connection error"
                );
                false
            }
        }
    }
}
