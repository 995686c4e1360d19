//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a peer service:
//!     → registry.rs (breaker for the target name)
//!     → circuit_breaker.rs (admit, short-circuit or substitute fallback)
//!     → client (one HTTP GET, own timeout)
//!     → outcome recorded in the breaker's sliding window
//! ```
//!
//! # Design Decisions
//! - Breakers wrap calls explicitly; no hidden interception
//! - Nothing here retries; a breaker only changes fail-fast behaviour across calls
//! - A fallback value is always tagged so it cannot pass for a real answer

pub mod circuit_breaker;
pub mod registry;

use serde::Serialize;
use thiserror::Error;

use crate::client::ClientError;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot};
pub use registry::CircuitBreakerRegistry;

/// Circuit breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

/// Failure surfaced through a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// The call ran and failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The call was not attempted.
    #[error("circuit for {target} is open")]
    CircuitOpen { target: String },
}

/// A value from a guarded call, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum CallOutcome<T> {
    /// Produced by the remote call.
    Live(T),
    /// Substituted by an open circuit.
    Fallback(T),
}

impl<T> CallOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, CallOutcome::Fallback(_))
    }

    pub fn value(&self) -> &T {
        match self {
            CallOutcome::Live(v) | CallOutcome::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            CallOutcome::Live(v) | CallOutcome::Fallback(v) => v,
        }
    }
}
