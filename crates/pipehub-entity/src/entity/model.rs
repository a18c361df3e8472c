//! Secured entity tree node.

use serde::{Deserialize, Serialize};

use pipehub_core::types::EntityId;

use crate::permission::{Mask, ObjectIdentity};
use crate::storage::NfsMountStatus;

use super::kind::EntityType;

/// A node of a secured hierarchy: folders hold children (sub-folders) and
/// leaves (terminal resources such as pipelines, storages and runs).
///
/// `mask` is transient: it is set only by a resolution pass and is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuredEntity {
    /// Entity ID; `None` for synthetic nodes that are not registered.
    #[serde(default)]
    pub id: Option<EntityId>,
    /// Entity type tag.
    pub entity_type: EntityType,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owner user name.
    #[serde(default)]
    pub owner: String,
    /// Whether the entity is locked against mutation.
    #[serde(default)]
    pub locked: bool,
    /// Parent used for permission inheritance.
    #[serde(default)]
    pub parent: Option<ObjectIdentity>,
    /// NFS mount state of storage-class entities.
    #[serde(default)]
    pub mount_status: Option<NfsMountStatus>,
    /// Sub-folders (or other hierarchical children).
    #[serde(default)]
    pub children: Vec<SecuredEntity>,
    /// Terminal resources.
    #[serde(default)]
    pub leaves: Vec<SecuredEntity>,
    /// Simple mask resolved for the current caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Mask>,
}

impl SecuredEntity {
    /// Create a registered entity.
    pub fn new(entity_type: EntityType, id: i64, owner: impl Into<String>) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            entity_type,
            name: String::new(),
            owner: owner.into(),
            locked: false,
            parent: None,
            mount_status: None,
            children: Vec::new(),
            leaves: Vec::new(),
            mask: None,
        }
    }

    /// Create a synthetic node without an id (e.g. a virtual root).
    pub fn synthetic(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            ..Self::new(entity_type, 0, "")
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the inheritance parent.
    pub fn with_parent(mut self, parent: ObjectIdentity) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the NFS mount state.
    pub fn with_mount_status(mut self, status: NfsMountStatus) -> Self {
        self.mount_status = Some(status);
        self
    }

    /// Mark the entity as locked.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Append a child, defaulting its parent to this entity.
    pub fn with_child(mut self, child: SecuredEntity) -> Self {
        self.children.push(self.adopt(child));
        self
    }

    /// Append a leaf, defaulting its parent to this entity.
    pub fn with_leaf(mut self, leaf: SecuredEntity) -> Self {
        self.leaves.push(self.adopt(leaf));
        self
    }

    fn adopt(&self, mut node: SecuredEntity) -> SecuredEntity {
        if node.parent.is_none() {
            node.parent = self.identity();
        }
        node
    }

    /// Whether the entity is registered (has an id).
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// Object identity, if the entity has an id.
    pub fn identity(&self) -> Option<ObjectIdentity> {
        self.id
            .map(|id| ObjectIdentity::from_id(self.entity_type, id))
    }

    /// Whether the entity has neither children nor leaves.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.leaves.is_empty()
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
            stack.extend(node.leaves.iter());
        }
        count
    }

    /// Find a node of this subtree by identity.
    pub fn find(&self, identity: &ObjectIdentity) -> Option<&SecuredEntity> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.identity().as_ref() == Some(identity) {
                return Some(node);
            }
            stack.extend(node.children.iter());
            stack.extend(node.leaves.iter());
        }
        None
    }
}
