//! End-to-end tests: typed clients, discovery, breakers and real HTTP.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use user_workload::client::ClientError;
use user_workload::config::{parse_config, FallbackStrategy, WorkloadConfig};
use user_workload::discovery::InstanceRegistry;
use user_workload::resilience::{BreakerError, CallOutcome, CircuitBreakerRegistry, CircuitState};
use user_workload::workload::WorkloadService;

fn build(config: &WorkloadConfig) -> (WorkloadService, CircuitBreakerRegistry) {
    let registry = Arc::new(InstanceRegistry::new(&config.instances, &config.health_check));
    let breakers = CircuitBreakerRegistry::from_config(config);
    let service = WorkloadService::from_config(config, registry, &breakers).unwrap();
    (service, breakers)
}

#[tokio::test]
async fn test_workload_through_discovery() {
    let projects = start_mock_peer(200, r#"{"count":3,"status":"OK"}"#).await;
    let tasks = start_mock_peer(200, r#"{"data":7,"status":"OK","code":200,"success":true}"#).await;

    let (service, breakers) = build(&discovery_config(projects.addr, tasks.addr));
    let workload = service.workload("john.doe").await;

    assert_eq!(workload.user_name, "john.doe");
    assert_eq!(workload.confirmed_projects(), Some(3));
    assert_eq!(workload.confirmed_tasks(), Some(7));
    assert!(matches!(&workload.projects, Ok(CallOutcome::Live(resp)) if resp.http_status == 200));

    assert_eq!(projects.paths(), vec!["/api/v1/project/count/manager/john.doe"]);
    assert_eq!(tasks.paths(), vec!["/api/v1/task/count/employee/john.doe"]);
    assert!(breakers
        .snapshots()
        .iter()
        .all(|s| s.state == CircuitState::Closed));
}

#[tokio::test]
async fn test_key_is_escaped_as_one_segment() {
    let projects = start_mock_peer(200, r#"{"count":1}"#).await;
    let tasks = start_mock_peer(200, r#"{"count":1}"#).await;

    let (service, _) = build(&discovery_config(projects.addr, tasks.addr));
    let result = service.projects().non_completed_count_by_manager("jane doe/ops").await;

    assert_eq!(result.unwrap().value().count, 1);
    assert_eq!(projects.paths(), vec!["/api/v1/project/count/manager/jane%20doe%2Fops"]);
}

#[tokio::test]
async fn test_static_target_keeps_its_prefix() {
    let projects = start_mock_peer(200, r#"{"count":4,"status":"OK"}"#).await;
    let tasks = start_mock_peer(200, r#"{"count":0,"status":"OK"}"#).await;

    let config = static_config(
        &format!("http://{}/api/v1/project", projects.addr),
        &format!("http://{}/api/v1/task/", tasks.addr),
    );
    let (service, _) = build(&config);
    let workload = service.workload("mike").await;

    assert_eq!(workload.confirmed_projects(), Some(4));
    assert_eq!(workload.confirmed_tasks(), Some(0));
    assert_eq!(projects.paths(), vec!["/api/v1/project/count/manager/mike"]);
    assert_eq!(tasks.paths(), vec!["/api/v1/task/count/employee/mike"]);
}

#[tokio::test]
async fn test_circuit_opens_and_stops_calling_peer() {
    let projects = start_mock_peer(500, r#"{"message":"boom"}"#).await;
    let tasks = start_mock_peer(200, r#"{"count":2}"#).await;

    let mut config = discovery_config(projects.addr, tasks.addr);
    config
        .circuit_breakers
        .insert("project-service".into(), tight_breaker(5, FallbackStrategy::Error));
    let (service, _) = build(&config);

    for _ in 0..5 {
        let result = service.projects().non_completed_count_by_manager("john.doe").await;
        assert!(matches!(
            result,
            Err(BreakerError::Client(ClientError::RemoteRejected { status: 500, .. }))
        ));
    }
    assert_eq!(service.projects().breaker().state(), CircuitState::Open);
    assert_eq!(projects.hits(), 5);

    for _ in 0..3 {
        let result = service.projects().non_completed_count_by_manager("john.doe").await;
        assert!(matches!(result, Err(BreakerError::CircuitOpen { ref target }) if target == "project-service"));
    }
    assert_eq!(projects.hits(), 5);

    // The other peer has its own breaker.
    let tasks_result = service.tasks().non_completed_count_by_employee("john.doe").await;
    assert_eq!(tasks_result.unwrap(), CallOutcome::Live(tasks_result_body(2)));
}

#[tokio::test]
async fn test_circuit_recovers_once_peer_heals() {
    let served = Arc::new(AtomicUsize::new(0));
    let projects = start_programmable_peer({
        let served = served.clone();
        move |_path| {
            let n = served.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 5 {
                    (500, r#"{"message":"boom"}"#.to_string())
                } else {
                    (200, r#"{"count":3,"status":"OK"}"#.to_string())
                }
            }
        }
    })
    .await;
    let tasks = start_mock_peer(200, r#"{"count":1}"#).await;

    // Default health thresholds, no active monitor.
    let mut config = discovery_config(projects.addr, tasks.addr);
    let mut breaker = tight_breaker(5, FallbackStrategy::Error);
    breaker.open_state_duration_ms = 50;
    config.circuit_breakers.insert("project-service".into(), breaker);
    let (service, _) = build(&config);

    for _ in 0..5 {
        let result = service.projects().non_completed_count_by_manager("john.doe").await;
        assert!(matches!(
            result,
            Err(BreakerError::Client(ClientError::RemoteRejected { status: 500, .. }))
        ));
    }
    assert_eq!(service.projects().breaker().state(), CircuitState::Open);
    assert_eq!(projects.hits(), 5);

    let result = service.projects().non_completed_count_by_manager("john.doe").await;
    assert!(matches!(result, Err(BreakerError::CircuitOpen { .. })));
    assert_eq!(projects.hits(), 5);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let trial = service.projects().non_completed_count_by_manager("john.doe").await;
    assert!(matches!(&trial, Ok(CallOutcome::Live(resp)) if resp.count == 3), "trial got {trial:?}");
    assert_eq!(projects.hits(), 6);
    assert_eq!(service.projects().breaker().state(), CircuitState::Closed);
}

fn tasks_result_body(count: u64) -> user_workload::client::CountResponse {
    user_workload::client::CountResponse {
        count,
        status: None,
        message: None,
        code: None,
        success: None,
        http_status: 200,
    }
}

#[tokio::test]
async fn test_open_circuit_serves_fallback_zero() {
    let projects = start_mock_peer(200, r#"{"count":9}"#).await;
    let tasks = start_mock_peer(503, "").await;

    let mut config = discovery_config(projects.addr, tasks.addr);
    config
        .circuit_breakers
        .insert("task-service".into(), tight_breaker(2, FallbackStrategy::FallbackValue));
    let (service, _) = build(&config);

    for _ in 0..2 {
        assert!(service.tasks().non_completed_count_by_employee("ann").await.is_err());
    }

    let workload = service.workload("ann").await;
    let tasks_outcome = workload.tasks.as_ref().unwrap();
    assert!(tasks_outcome.is_fallback());
    assert_eq!(tasks_outcome.value().count, 0);
    assert!(tasks_outcome.value().is_fallback());
    assert_eq!(workload.confirmed_tasks(), None);
    assert_eq!(workload.confirmed_projects(), Some(9));
    assert_eq!(tasks.hits(), 2);
}

#[tokio::test]
async fn test_client_errors_do_not_trip_breaker() {
    let projects = start_mock_peer(404, "").await;
    let tasks = start_mock_peer(200, r#"{"count":1}"#).await;

    let mut config = discovery_config(projects.addr, tasks.addr);
    config
        .circuit_breakers
        .insert("project-service".into(), tight_breaker(2, FallbackStrategy::Error));
    let (service, _) = build(&config);

    for _ in 0..4 {
        let result = service.projects().non_completed_count_by_manager("nobody").await;
        assert!(matches!(
            result,
            Err(BreakerError::Client(ClientError::RemoteRejected { status: 404, .. }))
        ));
    }
    assert_eq!(service.projects().breaker().state(), CircuitState::Closed);
    assert_eq!(projects.hits(), 4);
}

#[tokio::test]
async fn test_malformed_body() {
    let projects = start_mock_peer(200, r#"{"count":"many"}"#).await;
    let tasks = start_mock_peer(200, "<html>").await;

    let (service, _) = build(&discovery_config(projects.addr, tasks.addr));
    let workload = service.workload("john.doe").await;

    assert!(matches!(
        workload.projects,
        Err(BreakerError::Client(ClientError::MalformedResponse { ref target, .. })) if target == "project-service"
    ));
    assert!(matches!(
        workload.tasks,
        Err(BreakerError::Client(ClientError::MalformedResponse { .. }))
    ));
}

#[tokio::test]
async fn test_unreachable_peer() {
    let dead = closed_addr().await;
    let tasks = start_mock_peer(200, r#"{"count":1}"#).await;

    let config = static_config(&format!("http://{}/api/v1/project", dead), &format!("http://{}/api/v1/task", tasks.addr));
    let (service, _) = build(&config);

    let result = service.projects().non_completed_count_by_manager("john.doe").await;
    assert!(matches!(
        result,
        Err(BreakerError::Client(ClientError::Unreachable { ref target, .. })) if target == "project-service"
    ));
}

#[tokio::test]
async fn test_slow_peer_times_out() {
    let projects = start_programmable_peer(|_path| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, r#"{"count":1}"#.to_string())
    })
    .await;
    let tasks = start_mock_peer(200, r#"{"count":1}"#).await;

    let mut config = discovery_config(projects.addr, tasks.addr);
    for target in &mut config.targets {
        if target.name == "project-service" {
            target.request_timeout_ms = Some(100);
        }
    }
    let (service, _) = build(&config);

    let result = service.projects().non_completed_count_by_manager("john.doe").await;
    match result {
        Err(BreakerError::Client(ClientError::Unreachable { reason, .. })) => {
            assert!(reason.contains("timed out"), "unexpected reason: {reason}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_registered_instance() {
    let config = WorkloadConfig::default();
    let (service, _) = build(&config);

    let result = service.tasks().non_completed_count_by_employee("john.doe").await;
    assert!(matches!(
        result,
        Err(BreakerError::Client(ClientError::Unresolved { ref target, .. })) if target == "task-service"
    ));
}

#[tokio::test]
async fn test_wired_from_toml() {
    let projects = start_mock_peer(200, r#"{"count":5,"status":"OK"}"#).await;
    let tasks = start_mock_peer(200, r#"{"count":6,"status":"OK"}"#).await;

    let toml = format!(
        r#"
        [timeouts]
        request_ms = 2000

        [[targets]]
        name = "project-service"
        discovery = "project-service"
        api_prefix = "/api/v1/project"

        [[targets]]
        name = "task-service"
        url = "http://{task}/api/v1/task"

        [[instances]]
        service = "project-service"
        address = "{project}"

        [circuit_breakers.task-service]
        sliding_window_size = 4
        minimum_calls = 2

        [health_check]
        enabled = false
        "#,
        task = tasks.addr,
        project = projects.addr,
    );
    let config = parse_config(&toml).unwrap();
    let (service, breakers) = build(&config);

    let workload = service.workload("lee").await;
    assert_eq!(workload.confirmed_projects(), Some(5));
    assert_eq!(workload.confirmed_tasks(), Some(6));
    assert_eq!(breakers.breaker("task-service").config().sliding_window_size, 4);
}
