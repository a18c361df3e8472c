//! ACL records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use pipehub_core::types::{AclId, EntityId};

use crate::entity::EntityType;

use super::mask::Mask;
use super::sid::Sid;

/// Identity of a secured object: entity type tag plus entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentity {
    /// Entity type tag.
    pub entity_type: EntityType,
    /// Entity ID.
    pub id: EntityId,
}

impl ObjectIdentity {
    /// Create an object identity from a raw id.
    pub fn new(entity_type: EntityType, id: i64) -> Self {
        Self::from_id(entity_type, EntityId::new(id))
    }

    /// Create an object identity from a typed id.
    pub const fn from_id(entity_type: EntityType, id: EntityId) -> Self {
        Self { entity_type, id }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

impl FromStr for ObjectIdentity {
    type Err = pipehub_core::AppError;

    /// Parses `TYPE:ID`, e.g. `folder:12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            pipehub_core::AppError::validation(format!(
                "Invalid object identity '{s}', expected TYPE:ID"
            ))
        })?;
        let entity_type = kind.parse::<EntityType>()?;
        let id = id.parse::<EntityId>().map_err(|e| {
            pipehub_core::AppError::validation(format!("Invalid entity id in '{s}': {e}"))
        })?;
        Ok(Self { entity_type, id })
    }
}

/// One `(sid, mask)` pairing within an ACL. Its position is its index in
/// [`Acl::entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    /// The identity this entry applies to.
    pub sid: Sid,
    /// Extended permission mask.
    pub mask: Mask,
}

impl AccessControlEntry {
    /// Create an entry.
    pub fn new(sid: Sid, mask: Mask) -> Self {
        Self { sid, mask }
    }
}

/// The access control list of one secured entity.
///
/// The parent is a lookup key into the ACL store, never an owned reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Stored ACL id.
    pub id: AclId,
    /// The entity this ACL secures.
    pub identity: ObjectIdentity,
    /// Owner sid; always resolves to the full mask.
    pub owner: Sid,
    /// Ordered entries; earlier entries take precedence.
    #[serde(default)]
    pub entries: Vec<AccessControlEntry>,
    /// ACL consulted for permissions not resolved here.
    #[serde(default)]
    pub parent: Option<ObjectIdentity>,
    /// Whether unresolved permissions are looked up in the parent ACL.
    #[serde(default = "default_true")]
    pub entries_inheriting: bool,
    /// Optimistic concurrency version, bumped by every stored update.
    #[serde(default)]
    pub version: u64,
    /// `ROLE_USER` write and execute bits in force before the entity was
    /// locked. Restored on unlock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_lock_mask: Option<Mask>,
}

impl Acl {
    /// Create an empty, inheriting ACL.
    pub fn new(id: AclId, identity: ObjectIdentity, owner: Sid) -> Self {
        Self {
            id,
            identity,
            owner,
            entries: Vec::new(),
            parent: None,
            entries_inheriting: true,
            version: 0,
            pre_lock_mask: None,
        }
    }

    /// Set the parent lookup key.
    pub fn with_parent(mut self, parent: ObjectIdentity) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Append an entry (builder form).
    pub fn with_entry(mut self, sid: Sid, mask: Mask) -> Self {
        self.entries.push(AccessControlEntry::new(sid, mask));
        self
    }

    /// Position of the entry for `sid`, if any.
    pub fn find_entry(&self, sid: &Sid) -> Option<usize> {
        self.entries.iter().position(|ace| &ace.sid == sid)
    }

    /// The entry for `sid`, if any.
    pub fn entry_for(&self, sid: &Sid) -> Option<&AccessControlEntry> {
        self.entries.iter().find(|ace| &ace.sid == sid)
    }

    /// Insert an entry at `position` (clamped to the list length).
    pub fn insert_entry(&mut self, position: usize, sid: Sid, mask: Mask) {
        let position = position.min(self.entries.len());
        self.entries
            .insert(position, AccessControlEntry::new(sid, mask));
    }

    /// Remove the entry at `position`.
    pub fn delete_entry(&mut self, position: usize) -> Option<AccessControlEntry> {
        (position < self.entries.len()).then(|| self.entries.remove(position))
    }

    /// Remove every entry. Returns `true` if any entry was removed.
    pub fn clear_entries(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }

    /// Whether `sid` owns this ACL. Principal names match case-insensitively.
    pub fn is_owned_by(&self, sid: &Sid) -> bool {
        match &self.owner {
            Sid::Principal(name) => sid.is_user(name),
            owner => owner == sid,
        }
    }
}

fn default_true() -> bool {
    true
}
