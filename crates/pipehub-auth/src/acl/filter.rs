//! Permission-aware filtering of entity trees.
//!
//! Filtering runs in two phases. The resolve phase walks the tree
//! iteratively, enforces the depth bound and resolves every registered node
//! with one bulk ACL read. The prune phase then merges masks top-down and
//! drops invisible nodes bottom-up.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use pipehub_core::config::acl::AclConfig;
use pipehub_core::error::AppError;
use pipehub_core::result::AppResult;
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{AclPermission, Mask, NO_PERMISSIONS, ObjectIdentity, Sid};

use super::mask::PermissionMaskService;
use super::resolver::{PermissionResolver, ResolveOptions};

/// Prunes entity trees to what a caller may see.
#[derive(Debug, Clone)]
pub struct HierarchyFilter {
    /// Mask resolver.
    resolver: Arc<PermissionResolver>,
    /// Deepest nesting accepted.
    max_depth: usize,
}

/// Masks computed by the resolve phase.
struct ResolvedMasks {
    root: Mask,
    nodes: HashMap<ObjectIdentity, Mask>,
}

impl ResolvedMasks {
    fn own(&self, node: &SecuredEntity) -> Mask {
        node.identity()
            .and_then(|identity| self.nodes.get(&identity).copied())
            .unwrap_or(NO_PERMISSIONS)
    }
}

impl HierarchyFilter {
    /// Creates a filter.
    pub fn new(resolver: Arc<PermissionResolver>, config: &AclConfig) -> Self {
        Self {
            resolver,
            max_depth: config.max_tree_depth,
        }
    }

    /// Filter `root` down to the nodes on which `required` is granted to
    /// `sids`, annotating each survivor with its simple mask.
    ///
    /// A folder survives when it still has visible content or grants the
    /// permission itself; a leaf survives only if it grants it. Returns
    /// `None` when nothing is visible.
    pub async fn filter_tree(
        &self,
        sids: &[Sid],
        mut root: SecuredEntity,
        required: AclPermission,
    ) -> AppResult<Option<SecuredEntity>> {
        if required.is_denial() {
            return Err(AppError::validation(format!(
                "Cannot filter by deny permission {required}"
            )));
        }

        let masks = self.resolve_phase(sids, &root).await?;
        let visible = prune(&mut root, NO_PERMISSIONS, masks.root, &masks, required);

        info!(
            root_type = %root.entity_type,
            root_id = ?root.id,
            permission = %required,
            visible,
            remaining = if visible { root.subtree_size() } else { 0 },
            "Filtered entity tree"
        );
        Ok(visible.then_some(root))
    }

    async fn resolve_phase(&self, sids: &[Sid], root: &SecuredEntity) -> AppResult<ResolvedMasks> {
        let mut descendants: Vec<&SecuredEntity> = Vec::new();
        let mut has_storage = root.entity_type.is_storage();
        let mut stack: Vec<(&SecuredEntity, usize)> = vec![(root, 0)];

        while let Some((node, depth)) = stack.pop() {
            if depth > self.max_depth {
                return Err(AppError::validation(format!(
                    "Entity tree is nested deeper than {} levels",
                    self.max_depth
                )));
            }
            for child in node.children.iter().chain(node.leaves.iter()) {
                has_storage |= child.entity_type.is_storage();
                if child.has_id() {
                    descendants.push(child);
                }
                stack.push((child, depth + 1));
            }
        }

        let mut options = ResolveOptions::extended();
        if has_storage {
            let active = self
                .resolver
                .lookup_read_mode_quota(sids)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Quota lookup failed, treating storages as read-only");
                    true
                });
            options = options.with_read_mode_quota(active);
        }

        let root_mask = if root.has_id() {
            self.resolver.resolve(root, sids, options).await
        } else {
            NO_PERMISSIONS
        };
        let nodes = self
            .resolver
            .resolve_many(&descendants, sids, options.with_inherited(false))
            .await;

        debug!(nodes = nodes.len() + 1, "Resolved entity tree masks");
        Ok(ResolvedMasks {
            root: root_mask,
            nodes,
        })
    }
}

/// Merge masks down the tree and drop what `required` hides. Returns whether
/// `node` stays. Recursion depth is bounded by the resolve phase.
fn prune(
    node: &mut SecuredEntity,
    parent_mask: Mask,
    own_mask: Mask,
    masks: &ResolvedMasks,
    required: AclPermission,
) -> bool {
    let current = if node.has_id() {
        PermissionMaskService::merge_parent_mask(own_mask, parent_mask)
    } else {
        NO_PERMISSIONS
    };

    node.children.retain_mut(|child| {
        let own = masks.own(child);
        prune(child, current, own, masks, required)
    });

    node.leaves.retain_mut(|leaf| {
        let leaf_mask = PermissionMaskService::merge_parent_mask(masks.own(leaf), current);
        if PermissionMaskService::is_granted(leaf_mask, required) {
            leaf.mask = Some(PermissionMaskService::merge_mask(leaf_mask));
            true
        } else {
            false
        }
    });

    node.mask = Some(PermissionMaskService::merge_mask(current));
    !node.is_empty() || PermissionMaskService::is_granted(current, required)
}
