//! Typed remote client subsystem.
//!
//! # Data Flow
//! ```text
//! (target, path template, key)
//!     → target.rs (static URL or locator → base URL, key → one path segment)
//!     → http.rs (GET with timeout + x-request-id)
//!     → response.rs (JSON envelope → CountResponse)
//!     → error.rs (Unreachable / RemoteRejected / MalformedResponse / Unresolved)
//! ```

pub mod error;
pub mod http;
pub mod response;
pub mod target;

pub use error::{ClientError, ClientResult};
pub use http::HttpCountClient;
pub use response::CountResponse;
pub use target::{PathTemplate, Resolution, ServiceTarget, TargetError};
