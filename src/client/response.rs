//! Count response envelope returned by the peer services.

use serde::{Deserialize, Serialize};

/// Status tag carried by breaker-substituted responses.
pub const FALLBACK_STATUS: &str = "FALLBACK";

/// An aggregate count plus the response metadata around it.
///
/// Peers send either `{"count": 3, "status": "OK"}` or the wrapped form
/// `{"success": true, "message": "...", "code": 200, "data": 3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    #[serde(alias = "data")]
    pub count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// HTTP status observed by the client; not part of the body.
    #[serde(skip)]
    pub http_status: u16,
}

impl CountResponse {
    /// Zero count handed out while a circuit is open.
    pub fn fallback() -> Self {
        Self {
            count: 0,
            status: Some(FALLBACK_STATUS.to_string()),
            message: Some("circuit open, count unavailable".to_string()),
            code: None,
            success: Some(false),
            http_status: 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status.as_deref() == Some(FALLBACK_STATUS)
    }
}
