//! Role types.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// A persisted role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub description: String,
}

/// Raw role description as it arrives in a payload.
///
/// Any JSON scalar is accepted and read as text; objects and arrays are not
/// role references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoleCode(String);

impl RoleCode {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoleCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RoleCodeVisitor)
    }
}

struct RoleCodeVisitor;

impl<'de> Visitor<'de> for RoleCodeVisitor {
    type Value = RoleCode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a role description")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RoleCode, E> {
        Ok(RoleCode::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RoleCode, E> {
        Ok(RoleCode(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RoleCode, E> {
        Ok(RoleCode(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RoleCode, E> {
        Ok(RoleCode(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RoleCode, E> {
        Ok(RoleCode(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RoleCode, E> {
        Ok(RoleCode(v.to_string()))
    }
}
