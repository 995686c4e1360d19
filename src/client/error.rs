//! Remote client errors.

use thiserror::Error;

use crate::discovery::LocatorError;

/// Failure of a single outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection failure or timeout.
    #[error("{target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    /// The peer answered with a 4xx or 5xx status.
    #[error("{target} rejected the request with status {status}")]
    RemoteRejected { target: String, status: u16 },

    /// A 2xx body that does not match the expected envelope.
    #[error("{target} returned a malformed response: {reason}")]
    MalformedResponse { target: String, reason: String },

    /// No instance could be located to call.
    #[error("{target} could not be resolved: {source}")]
    Unresolved {
        target: String,
        #[source]
        source: LocatorError,
    },
}

/// Result type for remote client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether this outcome should count against the target's health.
    ///
    /// Client-side rejections (4xx) mean the peer is up and answering.
    pub fn is_failure(&self) -> bool {
        match self {
            ClientError::RemoteRejected { status, .. } => *status >= 500,
            _ => true,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            ClientError::Unreachable { target, .. }
            | ClientError::RemoteRejected { target, .. }
            | ClientError::MalformedResponse { target, .. }
            | ClientError::Unresolved { target, .. } => target,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unreachable { .. } => "unreachable",
            ClientError::RemoteRejected { .. } => "rejected",
            ClientError::MalformedResponse { .. } => "malformed",
            ClientError::Unresolved { .. } => "unresolved",
        }
    }
}
