//! Per-user workload counts from the project and task services.
//!
//! # Responsibilities
//! - Wire the typed peer clients from configuration
//! - Query both peers for one user concurrently
//! - Keep fallback zeros distinguishable from counts a healthy peer reported

pub mod clients;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::client::{HttpCountClient, ServiceTarget, TargetError};
use crate::config::WorkloadConfig;
use crate::discovery::ServiceLocator;
use crate::resilience::{CallOutcome, CircuitBreakerRegistry};

pub use clients::{CountResult, ProjectClient, TaskClient, PROJECT_COUNT_BY_MANAGER, TASK_COUNT_BY_EMPLOYEE};

/// Logical name of the project service target.
pub const PROJECT_SERVICE: &str = "project-service";
/// Logical name of the task service target.
pub const TASK_SERVICE: &str = "task-service";

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("no target named '{0}' is configured")]
    MissingTarget(&'static str),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Counts for one user. Each side fails or falls back independently.
#[derive(Debug)]
pub struct UserWorkload {
    pub user_name: String,
    pub projects: CountResult,
    pub tasks: CountResult,
}

/// How one side of a workload query ended, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CountReport {
    Live { count: u64 },
    Fallback { count: u64 },
    Failed { error: String },
}

impl From<&CountResult> for CountReport {
    fn from(result: &CountResult) -> Self {
        match result {
            Ok(CallOutcome::Live(resp)) => CountReport::Live { count: resp.count },
            Ok(CallOutcome::Fallback(resp)) => CountReport::Fallback { count: resp.count },
            Err(e) => CountReport::Failed { error: e.to_string() },
        }
    }
}

fn confirmed(result: &CountResult) -> Option<u64> {
    match result {
        Ok(CallOutcome::Live(resp)) => Some(resp.count),
        _ => None,
    }
}

impl UserWorkload {
    /// Project count reported by a healthy project service, if any.
    pub fn confirmed_projects(&self) -> Option<u64> {
        confirmed(&self.projects)
    }

    /// Task count reported by a healthy task service, if any.
    pub fn confirmed_tasks(&self) -> Option<u64> {
        confirmed(&self.tasks)
    }
}

/// Entry point for workload lookups.
#[derive(Debug, Clone)]
pub struct WorkloadService {
    projects: ProjectClient,
    tasks: TaskClient,
}

impl WorkloadService {
    pub fn new(projects: ProjectClient, tasks: TaskClient) -> Self {
        Self { projects, tasks }
    }

    /// Build both peer clients from configuration.
    pub fn from_config(
        config: &WorkloadConfig,
        locator: Arc<dyn ServiceLocator>,
        breakers: &CircuitBreakerRegistry,
    ) -> Result<Self, WorkloadError> {
        let http = HttpCountClient::new(&config.timeouts, locator)?;

        let project_target = config
            .target(PROJECT_SERVICE)
            .ok_or(WorkloadError::MissingTarget(PROJECT_SERVICE))?;
        let task_target = config
            .target(TASK_SERVICE)
            .ok_or(WorkloadError::MissingTarget(TASK_SERVICE))?;

        let projects = ProjectClient::new(
            http.clone(),
            ServiceTarget::from_config(project_target)?,
            breakers.breaker(PROJECT_SERVICE),
        )?;
        let tasks = TaskClient::new(
            http,
            ServiceTarget::from_config(task_target)?,
            breakers.breaker(TASK_SERVICE),
        )?;

        Ok(Self::new(projects, tasks))
    }

    pub fn projects(&self) -> &ProjectClient {
        &self.projects
    }

    pub fn tasks(&self) -> &TaskClient {
        &self.tasks
    }

    /// Non-completed project and task counts for `user_name`.
    pub async fn workload(&self, user_name: &str) -> UserWorkload {
        let (projects, tasks) = tokio::join!(
            self.projects.non_completed_count_by_manager(user_name),
            self.tasks.non_completed_count_by_employee(user_name),
        );

        tracing::debug!(
            user = %user_name,
            projects = ?CountReport::from(&projects),
            tasks = ?CountReport::from(&tasks),
            "Workload collected"
        );

        UserWorkload {
            user_name: user_name.to_string(),
            projects,
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, CountResponse};
    use crate::config::TargetConfig;
    use crate::discovery::InstanceRegistry;
    use crate::resilience::BreakerError;

    #[test]
    fn test_reports_keep_fallback_apart_from_live_zero() {
        let live: CountResult = Ok(CallOutcome::Live(CountResponse {
            count: 0,
            status: Some("OK".into()),
            message: None,
            code: None,
            success: None,
            http_status: 200,
        }));
        let fallback: CountResult = Ok(CallOutcome::Fallback(CountResponse::fallback()));
        let failed: CountResult = Err(BreakerError::Client(ClientError::RemoteRejected {
            target: TASK_SERVICE.into(),
            status: 500,
        }));

        assert_eq!(CountReport::from(&live), CountReport::Live { count: 0 });
        assert_eq!(CountReport::from(&fallback), CountReport::Fallback { count: 0 });
        assert!(matches!(CountReport::from(&failed), CountReport::Failed { .. }));

        assert_eq!(confirmed(&live), Some(0));
        assert_eq!(confirmed(&fallback), None);
        assert_eq!(confirmed(&failed), None);
    }

    #[test]
    fn test_from_config_requires_both_targets() {
        let mut config = WorkloadConfig::default();
        config.targets.retain(|t| t.name != TASK_SERVICE);
        let locator = Arc::new(InstanceRegistry::new(&[], &config.health_check));
        let breakers = CircuitBreakerRegistry::from_config(&config);

        let err = WorkloadService::from_config(&config, locator, &breakers).unwrap_err();
        assert!(matches!(err, WorkloadError::MissingTarget(TASK_SERVICE)));

        config.targets.push(TargetConfig::fixed(TASK_SERVICE, "http://127.0.0.1:8083/api/v1/task"));
        let locator = Arc::new(InstanceRegistry::new(&[], &config.health_check));
        assert!(WorkloadService::from_config(&config, locator, &breakers).is_ok());
    }
}
