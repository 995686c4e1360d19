//! HTTP transport for count lookups.
//!
//! # Responsibilities
//! - Resolve the target's base address (locator or static URL)
//! - Issue one GET with an explicit timeout and a request id
//! - Map transport, status and body problems onto `ClientError`
//! - Report passive health for discovered instances
//!
//! # Design Decisions
//! - Never retries; retry and fail-fast policy live above this layer
//! - Timeout expiry is reported exactly like a connection failure
//! - 4xx answers prove the instance is alive and count as healthy

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use uuid::Uuid;

use crate::client::error::{ClientError, ClientResult};
use crate::client::response::CountResponse;
use crate::client::target::{PathTemplate, ServiceTarget};
use crate::config::TimeoutConfig;
use crate::discovery::ServiceLocator;
use crate::observability::metrics;

/// Typed client issuing count lookups against peer services.
#[derive(Clone)]
pub struct HttpCountClient {
    http: reqwest::Client,
    locator: Arc<dyn ServiceLocator>,
    request_timeout: Duration,
}

impl HttpCountClient {
    /// Build a client with the configured connect and request timeouts.
    pub fn new(timeouts: &TimeoutConfig, locator: Arc<dyn ServiceLocator>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.request())
            .build()?;

        Ok(Self {
            http,
            locator,
            request_timeout: timeouts.request(),
        })
    }

    /// GET `path` (with `key` substituted) on `target` and parse the count.
    ///
    /// `key` must be the raw value, not pre-escaped. It is percent-encoded as
    /// exactly one path segment, so `a%20b` is sent as `a%2520b`.
    pub async fn get_non_completed_count(
        &self,
        target: &ServiceTarget,
        path: &PathTemplate,
        key: &str,
    ) -> ClientResult<CountResponse> {
        let start = Instant::now();
        let result = self.fetch(target, path, key).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_remote_call(target.name(), outcome, start);
        result
    }

    async fn fetch(&self, target: &ServiceTarget, path: &PathTemplate, key: &str) -> ClientResult<CountResponse> {
        let name = target.name();

        let base = target
            .resolve(self.locator.as_ref())
            .map_err(|source| ClientError::Unresolved {
                target: name.to_string(),
                source,
            })?;
        let url = path
            .expand(&base.url, key)
            .ok_or_else(|| ClientError::Unreachable {
                target: name.to_string(),
                reason: format!("base url '{}' cannot carry a path", base.url),
            })?;

        let request_id = Uuid::new_v4().to_string();
        let timeout = target.request_timeout().unwrap_or(self.request_timeout);
        let report = |healthy: bool| {
            if let Some(instance) = &base.instance {
                self.locator.report(instance, healthy);
            }
        };

        tracing::debug!(
            request_id = %request_id,
            target = %name,
            url = %url,
            timeout_ms = timeout.as_millis() as u64,
            "Requesting count"
        );

        let response = match self
            .http
            .get(url.clone())
            .header("x-request-id", &request_id)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out after {}ms", timeout.as_millis())
                } else {
                    e.to_string()
                };
                tracing::warn!(request_id = %request_id, target = %name, url = %url, reason = %reason, "Count request failed");
                report(false);
                return Err(ClientError::Unreachable {
                    target: name.to_string(),
                    reason,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(request_id = %request_id, target = %name, status = %status, "Count request rejected");
            report(!status.is_server_error());
            return Err(ClientError::RemoteRejected {
                target: name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                report(false);
                return Err(ClientError::Unreachable {
                    target: name.to_string(),
                    reason: format!("failed reading body: {}", e),
                });
            }
        };
        report(true);

        let mut parsed: CountResponse =
            serde_json::from_slice(&body).map_err(|e| ClientError::MalformedResponse {
                target: name.to_string(),
                reason: e.to_string(),
            })?;
        parsed.http_status = status.as_u16();

        tracing::debug!(request_id = %request_id, target = %name, count = parsed.count, "Count received");
        Ok(parsed)
    }
}

impl std::fmt::Debug for HttpCountClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCountClient")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
