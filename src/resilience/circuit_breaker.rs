//! Circuit breaker for peer service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: target assumed down, calls fail fast
//! - Half-Open: a limited number of trial calls probe recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= minimum_calls and failure ratio >= threshold
//! Open → Half-Open: first call after open_state_duration
//! Half-Open → Closed: a trial call succeeds (window reset)
//! Half-Open → Open: a trial call fails (cool-down restarts)
//! ```
//!
//! Every transition bumps a generation counter. Outcomes of calls admitted
//! under an older generation are dropped, so a slow call that started before
//! a trip cannot vote on the new state.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::client::{ClientError, ClientResult};
use crate::config::{CircuitBreakerConfig, FallbackStrategy};
use crate::observability::metrics;
use crate::resilience::{BreakerError, CallOutcome, CircuitState};

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Most recent outcomes, `true` for a failure.
    window: VecDeque<bool>,
    failures: usize,
    last_transition: Instant,
    trial_permits: u32,
    generation: u64,
}

impl Inner {
    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.window.len() as f64
        }
    }

    fn reset_window(&mut self) {
        self.window.clear();
        self.failures = 0;
    }
}

/// Read-only view of a breaker for observability.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub target: String,
    pub state: CircuitState,
    pub failure_count: usize,
    pub window_len: usize,
    pub failure_rate: f64,
    pub since_transition_ms: u64,
}

/// Per-target circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Admission ticket for one call. Dropping it without completing (the
/// caller's future was cancelled) hands a half-open trial slot back.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    completed: bool,
}

impl CallGuard<'_> {
    fn complete(mut self, failed: bool) {
        self.completed = true;
        self.breaker.on_result(self.generation, failed);
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.release(self.generation);
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = VecDeque::with_capacity(config.sliding_window_size);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window,
                failures: 0,
                last_transition: Instant::now(),
                trial_permits: 0,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state as last recorded; an expired Open only moves to
    /// Half-Open when the next call arrives.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            target: self.name.clone(),
            state: inner.state,
            failure_count: inner.failures,
            window_len: inner.window.len(),
            failure_rate: inner.failure_rate(),
            since_transition_ms: inner.last_transition.elapsed().as_millis() as u64,
        }
    }

    /// Run `op` unless the circuit is open.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let Some(guard) = self.acquire() else {
            metrics::record_short_circuit(&self.name);
            tracing::debug!(target_service = %self.name, "Call short-circuited");
            return Err(BreakerError::CircuitOpen {
                target: self.name.clone(),
            });
        };

        let result = op().await;
        guard.complete(result.as_ref().err().is_some_and(ClientError::is_failure));
        result.map_err(BreakerError::Client)
    }

    /// Like [`execute`](Self::execute), but honours the configured fallback
    /// strategy when the call is short-circuited.
    pub async fn execute_with_fallback<T, F, Fut, G>(&self, op: F, fallback: G) -> Result<CallOutcome<T>, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
        G: FnOnce() -> T,
    {
        match self.execute(op).await {
            Ok(value) => Ok(CallOutcome::Live(value)),
            Err(BreakerError::CircuitOpen { .. })
                if self.config.fallback_strategy == FallbackStrategy::FallbackValue =>
            {
                Ok(CallOutcome::Fallback(fallback()))
            }
            Err(e) => Err(e),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State stays consistent under poisoning: every mutation is a
        // handful of field writes with no panicking calls in between.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self) -> Option<CallGuard<'_>> {
        let mut inner = self.lock();
        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if inner.last_transition.elapsed() >= self.config.open_state_duration() {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_permits = inner.trial_permits.saturating_sub(1);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_permits > 0 {
                    inner.trial_permits -= 1;
                    true
                } else {
                    false
                }
            }
        };

        admitted.then(|| CallGuard {
            breaker: self,
            generation: inner.generation,
            completed: false,
        })
    }

    fn on_result(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if generation != inner.generation {
            tracing::trace!(target_service = %self.name, "Dropping outcome from an earlier circuit state");
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                if failed {
                    inner.failures += 1;
                }
                if inner.window.len() > self.config.sliding_window_size {
                    if let Some(true) = inner.window.pop_front() {
                        inner.failures -= 1;
                    }
                }

                if inner.window.len() >= self.config.minimum_calls
                    && inner.failure_rate() >= self.config.failure_rate_threshold
                {
                    tracing::warn!(
                        target_service = %self.name,
                        failures = inner.failures,
                        window = inner.window.len(),
                        threshold = self.config.failure_rate_threshold,
                        "Failure rate threshold reached"
                    );
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                let next = if failed {
                    CircuitState::Open
                } else {
                    CircuitState::Closed
                };
                self.transition(&mut inner, next);
            }
            // Generation changes on every transition, so no admitted call
            // can report into Open.
            CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if generation == inner.generation && inner.state == CircuitState::HalfOpen {
            inner.trial_permits += 1;
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.last_transition = Instant::now();
        inner.generation += 1;
        inner.reset_window();
        inner.trial_permits = match to {
            CircuitState::HalfOpen => self.config.half_open_trial_count,
            _ => 0,
        };

        match to {
            CircuitState::Open => {
                tracing::warn!(target_service = %self.name, from = ?from, open_for = ?self.config.open_state_duration(), "Circuit opened")
            }
            _ => tracing::info!(target_service = %self.name, from = ?from, to = ?to, "Circuit state changed"),
        }
        metrics::record_circuit_state(&self.name, to);
    }
}
