//! Permission-related domain events.

use serde::{Deserialize, Serialize};

/// Events related to ACL mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PermissionEvent {
    /// An ACE was created or replaced.
    Granted {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
        /// Sid name.
        sid: String,
        /// Whether the sid is a principal.
        principal: bool,
        /// The extended mask written.
        mask: u32,
    },
    /// An ACE was removed.
    Revoked {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
        /// Sid name.
        sid: String,
        /// Whether the sid is a principal.
        principal: bool,
    },
    /// Every ACE of an entity was removed.
    Cleared {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
    },
    /// An entity was locked.
    Locked {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
    },
    /// An entity was unlocked.
    Unlocked {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
    },
    /// The owner of an entity changed.
    OwnerChanged {
        /// Entity type tag.
        entity_type: String,
        /// Entity ID.
        entity_id: i64,
        /// New owner name.
        owner: String,
    },
    /// A sid and all its ACEs were deleted.
    SidDeleted {
        /// Sid name.
        sid: String,
        /// Whether the sid is a principal.
        principal: bool,
        /// Number of ACLs that lost an entry.
        affected_acls: usize,
    },
}
