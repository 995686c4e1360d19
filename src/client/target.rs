//! Service targets and request path templates.
//!
//! # Responsibilities
//! - Fix one resolution strategy per target (discovery or static URL)
//! - Turn a resolved base address plus a path template into a request URL
//! - Percent-encode the substituted key as exactly one path segment

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::TargetConfig;
use crate::discovery::{LocatorError, ServiceInstance, ServiceLocator};

/// Errors building targets or templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target '{0}' must set exactly one of discovery or url")]
    AmbiguousResolution(String),

    #[error("target '{target}' has invalid base url: {reason}")]
    InvalidUrl { target: String, reason: String },

    #[error("path template '{0}' has no {{placeholder}}")]
    NoPlaceholder(String),

    #[error("path template '{0}' has more than one {{placeholder}}")]
    MultiplePlaceholders(String),

    #[error("path template '{0}' must use the placeholder as a whole segment")]
    PartialSegment(String),
}

/// How a target's base address is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Ask the locator for a live instance, then append `api_prefix`.
    Discovery { service: String, api_prefix: String },
    /// Fixed base URL that already carries any prefix.
    Static { base_url: Url },
}

/// A peer service the client calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    name: String,
    resolution: Resolution,
    request_timeout: Option<Duration>,
}

/// A resolved base address, and the instance it came from if discovered.
#[derive(Debug, Clone)]
pub struct ResolvedBase {
    pub url: Url,
    pub instance: Option<Arc<ServiceInstance>>,
}

impl ServiceTarget {
    pub fn discovery(name: impl Into<String>, service: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Discovery {
                service: service.into(),
                api_prefix: api_prefix.into(),
            },
            request_timeout: None,
        }
    }

    pub fn fixed(name: impl Into<String>, base_url: &str) -> Result<Self, TargetError> {
        let name = name.into();
        let base_url = parse_http_url(&name, base_url)?;
        Ok(Self {
            name,
            resolution: Resolution::Static { base_url },
            request_timeout: None,
        })
    }

    pub fn from_config(config: &TargetConfig) -> Result<Self, TargetError> {
        let target = match (&config.discovery, &config.url) {
            (Some(service), None) => Self::discovery(&config.name, service, &config.api_prefix),
            (None, Some(url)) => Self::fixed(&config.name, url)?,
            _ => return Err(TargetError::AmbiguousResolution(config.name.clone())),
        };
        Ok(target.with_request_timeout(config.request_timeout_ms.map(Duration::from_millis)))
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Resolve the base URL requests for this target are built on.
    pub fn resolve(&self, locator: &dyn ServiceLocator) -> Result<ResolvedBase, LocatorError> {
        match &self.resolution {
            Resolution::Static { base_url } => Ok(ResolvedBase {
                url: base_url.clone(),
                instance: None,
            }),
            Resolution::Discovery { service, api_prefix } => {
                let instance = locator.resolve(service)?;
                // A SocketAddr always yields a valid http URL.
                let mut url = instance
                    .base_url()
                    .map_err(|_| LocatorError::ServiceUnavailable {
                        service: service.clone(),
                    })?;
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty();
                    segments.extend(api_prefix.split('/').filter(|s| !s.is_empty()));
                }
                Ok(ResolvedBase {
                    url,
                    instance: Some(instance),
                })
            }
        }
    }
}

fn parse_http_url(target: &str, raw: &str) -> Result<Url, TargetError> {
    let invalid = |reason: String| TargetError::InvalidUrl {
        target: target.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Key,
}

/// A request path with exactly one `{name}` substitution point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    placeholder: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let mut placeholder = None;
        let mut segments = Vec::new();

        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let opens = part.matches('{').count();
            let closes = part.matches('}').count();
            if opens == 0 && closes == 0 {
                segments.push(Segment::Literal(part.to_string()));
                continue;
            }
            if opens != 1 || closes != 1 || !part.starts_with('{') || !part.ends_with('}') {
                return Err(TargetError::PartialSegment(raw.to_string()));
            }
            if placeholder.is_some() {
                return Err(TargetError::MultiplePlaceholders(raw.to_string()));
            }
            placeholder = Some(part[1..part.len() - 1].to_string());
            segments.push(Segment::Key);
        }

        let placeholder = placeholder.ok_or_else(|| TargetError::NoPlaceholder(raw.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            placeholder,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Name inside the braces, e.g. `assignedManager`.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Append the template to `base`, substituting `key` as one segment.
    ///
    /// Returns `None` for URLs that cannot carry a path (never the case for
    /// http or https).
    pub fn expand(&self, base: &Url, key: &str) -> Option<Url> {
        let mut url = base.clone();
        {
            let mut path = url.path_segments_mut().ok()?;
            path.pop_if_empty();
            for segment in &self.segments {
                match segment {
                    Segment::Literal(text) => path.push(text),
                    Segment::Key => path.push(key),
                };
            }
        }
        Some(url)
    }
}
