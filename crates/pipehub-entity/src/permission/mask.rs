//! Permission bit layout.
//!
//! Every basic permission owns a grant bit and a paired deny bit in the
//! extended mask. The simple mask collapses each pair into one presence
//! bit and is only ever derived for display.
//!
//! | Permission | extended | simple |
//! |------------|----------|--------|
//! | READ       | `1`      | `1`    |
//! | NO_READ    | `2`      | -      |
//! | WRITE      | `4`      | `2`    |
//! | NO_WRITE   | `8`      | -      |
//! | EXECUTE    | `16`     | `4`    |
//! | NO_EXECUTE | `32`     | -      |
//! | OWNER      | `64`     | `8`    |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An integer permission bitfield (extended or simple, depending on context).
pub type Mask = u32;

/// The empty mask.
pub const NO_PERMISSIONS: Mask = 0;

/// Full access in simple form: READ | WRITE | EXECUTE.
pub const ALL_PERMISSIONS_MASK: Mask = 0b0111;

/// Full access in extended form: the READ, WRITE and EXECUTE grant bits.
pub const ALL_PERMISSIONS_MASK_FULL: Mask = 0b01_0101;

/// The permissions that carry a grant/deny pair.
pub const BASIC_PERMISSIONS: [AclPermission; 3] = [
    AclPermission::Read,
    AclPermission::Write,
    AclPermission::Execute,
];

/// A named permission bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPermission {
    /// Read access.
    Read,
    /// Explicit denial of read access.
    NoRead,
    /// Write access.
    Write,
    /// Explicit denial of write access.
    NoWrite,
    /// Execute access.
    Execute,
    /// Explicit denial of execute access.
    NoExecute,
    /// Ownership marker.
    Owner,
}

impl AclPermission {
    /// Every permission in bit order.
    pub const ALL: [AclPermission; 7] = [
        Self::Read,
        Self::NoRead,
        Self::Write,
        Self::NoWrite,
        Self::Execute,
        Self::NoExecute,
        Self::Owner,
    ];

    /// The bit of this permission in the extended mask.
    pub const fn mask(self) -> Mask {
        match self {
            Self::Read => 1,
            Self::NoRead => 1 << 1,
            Self::Write => 1 << 2,
            Self::NoWrite => 1 << 3,
            Self::Execute => 1 << 4,
            Self::NoExecute => 1 << 5,
            Self::Owner => 1 << 6,
        }
    }

    /// The bit of this permission in the simple mask (0 for deny variants).
    pub const fn simple_mask(self) -> Mask {
        match self {
            Self::Read => 1,
            Self::Write => 1 << 1,
            Self::Execute => 1 << 2,
            Self::Owner => 1 << 3,
            Self::NoRead | Self::NoWrite | Self::NoExecute => 0,
        }
    }

    /// The paired deny permission of a basic grant permission.
    pub const fn deny(self) -> Option<AclPermission> {
        match self {
            Self::Read => Some(Self::NoRead),
            Self::Write => Some(Self::NoWrite),
            Self::Execute => Some(Self::NoExecute),
            _ => None,
        }
    }

    /// The extended bit of the paired deny permission, or 0.
    pub const fn deny_mask(self) -> Mask {
        match self.deny() {
            Some(deny) => deny.mask(),
            None => 0,
        }
    }

    /// Grant and deny bits together.
    pub const fn pair_mask(self) -> Mask {
        self.mask() | self.deny_mask()
    }

    /// Whether this is a deny variant.
    pub const fn is_denial(self) -> bool {
        matches!(self, Self::NoRead | Self::NoWrite | Self::NoExecute)
    }

    /// Return the permission name exchanged with callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::NoRead => "NO_READ",
            Self::Write => "WRITE",
            Self::NoWrite => "NO_WRITE",
            Self::Execute => "EXECUTE",
            Self::NoExecute => "NO_EXECUTE",
            Self::Owner => "OWNER",
        }
    }

    /// Permissions whose extended bit is present in `mask`.
    pub fn decode(mask: Mask) -> Vec<AclPermission> {
        Self::ALL
            .into_iter()
            .filter(|p| mask & p.mask() != 0)
            .collect()
    }

    /// Permissions whose simple bit is present in `mask`.
    pub fn decode_simple(mask: Mask) -> Vec<AclPermission> {
        Self::ALL
            .into_iter()
            .filter(|p| p.simple_mask() != 0 && mask & p.simple_mask() != 0)
            .collect()
    }
}

impl fmt::Display for AclPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AclPermission {
    type Err = pipehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "READ" => Ok(Self::Read),
            "NO_READ" => Ok(Self::NoRead),
            "WRITE" => Ok(Self::Write),
            "NO_WRITE" => Ok(Self::NoWrite),
            "EXECUTE" => Ok(Self::Execute),
            "NO_EXECUTE" => Ok(Self::NoExecute),
            "OWNER" => Ok(Self::Owner),
            _ => Err(pipehub_core::AppError::validation(format!(
                "Invalid permission: '{s}'. Expected one of: READ, NO_READ, WRITE, NO_WRITE, EXECUTE, NO_EXECUTE, OWNER"
            ))),
        }
    }
}
