//! Typed peer clients, one method per remote operation.

use std::sync::Arc;

use crate::client::{CountResponse, HttpCountClient, PathTemplate, ServiceTarget, TargetError};
use crate::resilience::{BreakerError, CallOutcome, CircuitBreaker};

/// Project service: non-completed projects assigned to a manager.
pub const PROJECT_COUNT_BY_MANAGER: &str = "/count/manager/{assignedManager}";

/// Task service: non-completed tasks assigned to an employee.
pub const TASK_COUNT_BY_EMPLOYEE: &str = "/count/employee/{assignedEmployee}";

/// Result of one guarded count lookup.
pub type CountResult = Result<CallOutcome<CountResponse>, BreakerError>;

/// One count endpoint on one target, behind that target's breaker.
#[derive(Debug, Clone)]
struct GuardedEndpoint {
    http: HttpCountClient,
    target: ServiceTarget,
    path: PathTemplate,
    breaker: Arc<CircuitBreaker>,
}

impl GuardedEndpoint {
    fn new(
        http: HttpCountClient,
        target: ServiceTarget,
        path: &str,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, TargetError> {
        Ok(Self {
            http,
            target,
            path: PathTemplate::parse(path)?,
            breaker,
        })
    }

    async fn count(&self, key: &str) -> CountResult {
        self.breaker
            .execute_with_fallback(
                || self.http.get_non_completed_count(&self.target, &self.path, key),
                CountResponse::fallback,
            )
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ProjectClient {
    endpoint: GuardedEndpoint,
}

impl ProjectClient {
    pub fn new(http: HttpCountClient, target: ServiceTarget, breaker: Arc<CircuitBreaker>) -> Result<Self, TargetError> {
        let endpoint = GuardedEndpoint::new(http, target, PROJECT_COUNT_BY_MANAGER, breaker)?;
        Ok(Self { endpoint })
    }

    /// `assigned_manager` is the raw user name; the client escapes it.
    pub async fn non_completed_count_by_manager(&self, assigned_manager: &str) -> CountResult {
        self.endpoint.count(assigned_manager).await
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.endpoint.breaker
    }
}

#[derive(Debug, Clone)]
pub struct TaskClient {
    endpoint: GuardedEndpoint,
}

impl TaskClient {
    pub fn new(http: HttpCountClient, target: ServiceTarget, breaker: Arc<CircuitBreaker>) -> Result<Self, TargetError> {
        let endpoint = GuardedEndpoint::new(http, target, TASK_COUNT_BY_EMPLOYEE, breaker)?;
        Ok(Self { endpoint })
    }

    /// `assigned_employee` is the raw user name; the client escapes it.
    pub async fn non_completed_count_by_employee(&self, assigned_employee: &str) -> CountResult {
        self.endpoint.count(assigned_employee).await
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.endpoint.breaker
    }
}
