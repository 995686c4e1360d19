//! Inbound user payload.

use std::cell::Cell;

use serde::de::{DeserializeSeed, Error as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::lookup::LookupError;
use crate::roles::model::Role;
use crate::roles::resolver::RoleResolver;

/// Why a user payload was rejected.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed user payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("user payload role rejected: {0}")]
    Role(#[from] LookupError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(alias = "MALE")]
    Male,
    #[serde(alias = "FEMALE")]
    Female,
}

/// A user with its role resolved to a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub role: Role,
}

/// Wire shape of every field but `role`, which goes through the resolver.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default)]
    id: Option<u64>,
    first_name: String,
    last_name: String,
    user_name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    gender: Option<Gender>,
}

impl UserDto {
    /// Parse a user payload, resolving its role through `resolver`.
    ///
    /// Nothing is returned unless every field, the role included, is valid.
    /// The `role` field is deserialized with [`RoleSeed`](crate::roles::RoleSeed),
    /// after the other fields, so malformed payloads never reach the lookup.
    /// The role lookup blocks.
    pub fn parse(bytes: &[u8], resolver: &RoleResolver) -> Result<Self, PayloadError> {
        let tree: serde_json::Value = serde_json::from_slice(bytes)?;
        let raw = RawUser::deserialize(&tree)?;
        let role_value = tree
            .get("role")
            .ok_or_else(|| serde_json::Error::missing_field("role"))?;

        let rejection = Cell::new(None);
        let role = resolver
            .seed()
            .capturing(&rejection)
            .deserialize(role_value)
            .map_err(|e| match rejection.take() {
                Some(lookup) => PayloadError::Role(lookup),
                None => PayloadError::Malformed(e),
            })?;

        Ok(Self {
            id: raw.id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            user_name: raw.user_name,
            phone: raw.phone,
            enabled: raw.enabled,
            gender: raw.gender,
            role,
        })
    }
}
