//! Role lookup service.
//!
//! # Responsibilities
//! - Define the lookup contract the payload parser depends on
//! - Provide the in-memory role repository seeded from configuration
//!
//! # Design Decisions
//! - Lookups are synchronous; parsing that resolves roles is blocking work
//! - Descriptions match exactly, there is no implicit role creation

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use thiserror::Error;

use crate::config::RoleConfig;
use crate::roles::model::Role;

/// Failure to resolve a role description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no role with description '{description}'")]
    NotFound { description: String },

    #[error("role service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

/// Something that can resolve a role description to a persisted role.
pub trait RoleLookup: Send + Sync {
    fn read_by_description(&self, description: &str) -> Result<Role, LookupError>;
}

/// In-memory role table keyed by description.
#[derive(Debug, Default)]
pub struct RoleRepository {
    by_description: DashMap<String, Role>,
    offline: AtomicBool,
}

impl RoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(roles: &[RoleConfig]) -> Self {
        let repo = Self::new();
        for role in roles {
            repo.insert(Role {
                id: role.id,
                description: role.description.clone(),
            });
        }
        tracing::debug!(count = repo.len(), "Role repository seeded");
        repo
    }

    pub fn insert(&self, role: Role) {
        self.by_description.insert(role.description.clone(), role);
    }

    pub fn len(&self) -> usize {
        self.by_description.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_description.is_empty()
    }

    /// Take the repository offline (or back). While offline every lookup
    /// fails with `ServiceUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }
}

impl RoleLookup for RoleRepository {
    fn read_by_description(&self, description: &str) -> Result<Role, LookupError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(LookupError::ServiceUnavailable {
                reason: "role repository is offline".to_string(),
            });
        }
        self.by_description
            .get(description)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LookupError::NotFound {
                description: description.to_string(),
            })
    }
}
