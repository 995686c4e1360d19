//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use user_workload::config::{
    CircuitBreakerConfig, FallbackStrategy, HealthCheckConfig, InstanceConfig, TargetConfig, WorkloadConfig,
};

/// A peer service answering every request through a programmable handler.
pub struct MockPeer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockPeer {
    /// Number of requests the peer has received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request paths in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

/// Start a mock peer returning a fixed status and body.
pub async fn start_mock_peer(status: u16, body: &'static str) -> MockPeer {
    start_programmable_peer(move |_path| async move { (status, body.to_string()) }).await
}

/// Start a mock peer whose handler sees the request path.
pub async fn start_programmable_peer<F, Fut>(f: F) -> MockPeer
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let paths = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let peer = MockPeer {
        addr,
        hits: hits.clone(),
        paths: paths.clone(),
    };

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let hits = hits.clone();
                    let paths = paths.clone();
                    tokio::spawn(async move {
                        let path = read_request_path(&mut socket).await;
                        hits.fetch_add(1, Ordering::SeqCst);
                        paths.lock().unwrap().push(path.clone());

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    peer
}

async fn read_request_path(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string()
}

/// A local address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Configuration with both peers discovered at the given addresses.
pub fn discovery_config(project: SocketAddr, task: SocketAddr) -> WorkloadConfig {
    WorkloadConfig {
        instances: vec![
            InstanceConfig {
                service: "project-service".into(),
                address: project.to_string(),
            },
            InstanceConfig {
                service: "task-service".into(),
                address: task.to_string(),
            },
        ],
        health_check: HealthCheckConfig {
            enabled: false,
            ..HealthCheckConfig::default()
        },
        ..WorkloadConfig::default()
    }
}

/// Configuration with both peers at fixed URLs.
pub fn static_config(project_url: &str, task_url: &str) -> WorkloadConfig {
    WorkloadConfig {
        targets: vec![
            TargetConfig::fixed("project-service", project_url),
            TargetConfig::fixed("task-service", task_url),
        ],
        ..WorkloadConfig::default()
    }
}

/// A breaker that opens after `window` straight failures.
pub fn tight_breaker(window: usize, fallback: FallbackStrategy) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_rate_threshold: 0.5,
        sliding_window_size: window,
        minimum_calls: window,
        open_state_duration_ms: 60_000,
        half_open_trial_count: 1,
        fallback_strategy: fallback,
    }
}
