//! NFS mount state of a data storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mount state of an NFS-backed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfsMountStatus {
    /// Mounted read-write.
    Active,
    /// Mounted read-only; forces a READ ceiling.
    ReadOnly,
    /// Mounting disabled.
    MountDisabled,
}

impl NfsMountStatus {
    /// Whether this state forces a read-only ceiling.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    /// Return the state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::ReadOnly => "READ_ONLY",
            Self::MountDisabled => "MOUNT_DISABLED",
        }
    }
}

impl fmt::Display for NfsMountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
