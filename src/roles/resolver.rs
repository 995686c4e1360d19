//! Role resolution during deserialization.
//!
//! A payload carries a role as its description text. Turning that into a
//! `Role` needs the role service, so the parser is handed a resolver
//! explicitly instead of reaching for a global.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use serde::de::{DeserializeSeed, Deserializer, Error as _};
use serde::Deserialize;

use crate::observability::metrics;
use crate::roles::lookup::{LookupError, RoleLookup};
use crate::roles::model::{Role, RoleCode};

/// Resolves raw role descriptions through a shared lookup service.
#[derive(Clone)]
pub struct RoleResolver {
    lookup: Arc<dyn RoleLookup>,
}

impl RoleResolver {
    pub fn new(lookup: Arc<dyn RoleLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve `raw_text` to exactly one existing role.
    ///
    /// Blocks on the lookup service.
    pub fn resolve(&self, raw_text: &str) -> Result<Role, LookupError> {
        let result = self.lookup.read_by_description(raw_text);
        match &result {
            Ok(role) => {
                metrics::record_role_lookup("found");
                tracing::trace!(description = %raw_text, role_id = role.id, "Role resolved");
            }
            Err(LookupError::NotFound { .. }) => {
                metrics::record_role_lookup("not_found");
                tracing::debug!(description = %raw_text, "Role not found");
            }
            Err(e @ LookupError::ServiceUnavailable { .. }) => {
                metrics::record_role_lookup("unavailable");
                tracing::warn!(description = %raw_text, error = %e, "Role lookup failed");
            }
        }
        result
    }

    pub fn resolve_code(&self, code: &RoleCode) -> Result<Role, LookupError> {
        self.resolve(code.as_str())
    }

    /// Seed that deserializes a role reference straight into a `Role`.
    pub fn seed(&self) -> RoleSeed<'_> {
        RoleSeed {
            resolver: self,
            rejection: None,
        }
    }
}

impl fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleResolver").finish_non_exhaustive()
    }
}

/// `DeserializeSeed` reading a scalar as role text and resolving it.
///
/// A failed resolution fails the surrounding deserialization. The
/// deserializer only carries a message, so a seed built with
/// [`capturing`](Self::capturing) also keeps the typed `LookupError`.
#[derive(Clone, Copy)]
pub struct RoleSeed<'a> {
    resolver: &'a RoleResolver,
    rejection: Option<&'a Cell<Option<LookupError>>>,
}

impl<'a> RoleSeed<'a> {
    /// Store the lookup failure, if any, in `slot`.
    pub fn capturing(self, slot: &'a Cell<Option<LookupError>>) -> Self {
        Self {
            rejection: Some(slot),
            ..self
        }
    }
}

impl fmt::Debug for RoleSeed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSeed")
            .field("capturing", &self.rejection.is_some())
            .finish_non_exhaustive()
    }
}

impl<'de> DeserializeSeed<'de> for RoleSeed<'_> {
    type Value = Role;

    fn deserialize<D>(self, deserializer: D) -> Result<Role, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = RoleCode::deserialize(deserializer)?;
        self.resolver.resolve_code(&code).map_err(|e| {
            let err = D::Error::custom(&e);
            if let Some(slot) = self.rejection {
                slot.set(Some(e));
            }
            err
        })
    }
}
