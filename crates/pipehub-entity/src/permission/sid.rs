//! Security identifiers.
//!
//! A sid is either a principal (a user name) or an authority (a role or
//! group). Well-known authorities are closed variants so checks compare
//! structurally instead of by formatted strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role name of platform administrators.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
/// Role name every authenticated user carries.
pub const ROLE_USER: &str = "ROLE_USER";
/// Role name of storage administrators.
pub const ROLE_STORAGE_ADMIN: &str = "ROLE_STORAGE_ADMIN";

/// A role or group authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Authority {
    /// Full access to everything.
    Admin,
    /// The default role of every user; target of the lock overlay.
    User,
    /// Full access to storage-class entities.
    StorageAdmin,
    /// Any other role or group, by name.
    Named(String),
}

impl Authority {
    /// Parse an authority name, mapping well-known roles to their variants.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_uppercase().as_str() {
            ROLE_ADMIN => Self::Admin,
            ROLE_USER => Self::User,
            ROLE_STORAGE_ADMIN => Self::StorageAdmin,
            _ => Self::Named(trimmed.to_string()),
        }
    }

    /// Return the authority name.
    pub fn name(&self) -> &str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::User => ROLE_USER,
            Self::StorageAdmin => ROLE_STORAGE_ADMIN,
            Self::Named(name) => name,
        }
    }
}

/// A security identifier: a principal or an authority.
///
/// Equality is by `(name, is_principal)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SidRecord", into = "SidRecord")]
pub enum Sid {
    /// A specific user.
    Principal(String),
    /// A role or group.
    Authority(Authority),
}

impl Sid {
    /// Create a principal sid.
    pub fn principal(name: impl Into<String>) -> Self {
        Self::Principal(name.into())
    }

    /// Create an authority sid from a role or group name.
    pub fn authority(name: &str) -> Self {
        Self::Authority(Authority::parse(name))
    }

    /// Create a sid from its stored `(name, is_principal)` form.
    pub fn from_parts(name: &str, is_principal: bool) -> Self {
        if is_principal {
            Self::principal(name)
        } else {
            Self::authority(name)
        }
    }

    /// The `ROLE_ADMIN` authority.
    pub fn admin() -> Self {
        Self::Authority(Authority::Admin)
    }

    /// The `ROLE_USER` authority.
    pub fn user_role() -> Self {
        Self::Authority(Authority::User)
    }

    /// Return the principal or authority name.
    pub fn name(&self) -> &str {
        match self {
            Self::Principal(name) => name,
            Self::Authority(authority) => authority.name(),
        }
    }

    /// Whether this sid is a principal.
    pub fn is_principal(&self) -> bool {
        matches!(self, Self::Principal(_))
    }

    /// Whether this sid is the given well-known authority.
    pub fn is_authority(&self, authority: &Authority) -> bool {
        matches!(self, Self::Authority(a) if a == authority)
    }

    /// Whether this sid is a principal with the given user name (case-insensitive).
    pub fn is_user(&self, user_name: &str) -> bool {
        matches!(self, Self::Principal(name) if name.eq_ignore_ascii_case(user_name))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(name) => write!(f, "user:{name}"),
            Self::Authority(authority) => write!(f, "role:{}", authority.name()),
        }
    }
}

/// Stored form of a sid.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidRecord {
    name: String,
    principal: bool,
}

impl From<SidRecord> for Sid {
    fn from(record: SidRecord) -> Self {
        Sid::from_parts(&record.name, record.principal)
    }
}

impl From<Sid> for SidRecord {
    fn from(sid: Sid) -> Self {
        SidRecord {
            principal: sid.is_principal(),
            name: sid.name().to_string(),
        }
    }
}
