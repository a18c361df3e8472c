//! Bit-level algebra over permission masks.
//!
//! Extended masks carry a grant and a deny bit per basic permission; see
//! [`pipehub_entity::permission::mask`] for the layout. Nothing here has
//! side effects.

use pipehub_core::error::AppError;
use pipehub_core::result::AppResult;
use pipehub_entity::permission::{
    ALL_PERMISSIONS_MASK, ALL_PERMISSIONS_MASK_FULL, AclPermission, BASIC_PERMISSIONS, Mask,
};

/// Grant/deny mask algebra.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionMaskService;

impl PermissionMaskService {
    /// Whether the grant or the deny bit of `permission` is present.
    pub fn is_permission_set(mask: Mask, permission: AclPermission) -> bool {
        mask & permission.pair_mask() != 0
    }

    /// Whether `permission` is granted: grant bit present, deny bit absent.
    pub fn is_granted(mask: Mask, permission: AclPermission) -> bool {
        mask & permission.mask() != 0 && !Self::contains_opposite_mask(mask, permission)
    }

    /// Whether the paired deny bit of `permission` is present, i.e. the
    /// permission is explicitly denied rather than simply absent.
    pub fn contains_opposite_mask(mask: Mask, permission: AclPermission) -> bool {
        mask & permission.deny_mask() != 0
    }

    /// Whether every basic permission has its grant or deny bit set.
    pub fn is_complete(mask: Mask) -> bool {
        BASIC_PERMISSIONS
            .iter()
            .all(|p| Self::is_permission_set(mask, *p))
    }

    /// Reject masks that grant and deny the same permission.
    pub fn validate_mask(mask: Mask) -> AppResult<()> {
        let conflicting: Vec<&str> = BASIC_PERMISSIONS
            .iter()
            .filter(|p| mask & p.pair_mask() == p.pair_mask())
            .map(|p| p.as_str())
            .collect();

        if conflicting.is_empty() {
            Ok(())
        } else {
            Err(AppError::invalid_mask(format!(
                "Mask {mask} both grants and denies {}",
                conflicting.join(", ")
            )))
        }
    }

    /// Collapse an extended mask into the simple display mask.
    ///
    /// A basic permission's simple bit is set iff its grant bit is present
    /// and its deny bit is absent; OWNER maps straight across.
    pub fn merge_mask(extended: Mask) -> Mask {
        let mut simple = BASIC_PERMISSIONS
            .iter()
            .filter(|p| Self::is_granted(extended, **p))
            .fold(0, |acc, p| acc | p.simple_mask());
        if extended & AclPermission::Owner.mask() != 0 {
            simple |= AclPermission::Owner.simple_mask();
        }
        simple
    }

    /// Fill the permissions a child mask leaves unresolved from its parent.
    ///
    /// Explicit child bits always win. The full-access sentinels pass
    /// through unchanged; a simple full mask as parent counts as the
    /// extended one.
    pub fn merge_parent_mask(child: Mask, parent: Mask) -> Mask {
        if child == ALL_PERMISSIONS_MASK_FULL || child == ALL_PERMISSIONS_MASK {
            return child;
        }
        let parent = if parent == ALL_PERMISSIONS_MASK {
            ALL_PERMISSIONS_MASK_FULL
        } else {
            parent
        };

        BASIC_PERMISSIONS
            .iter()
            .filter(|p| !Self::is_permission_set(child, **p))
            .fold(child, |acc, p| acc | (parent & p.pair_mask()))
    }

    /// The full-access mask in simple (`merge`) or extended form.
    pub fn full_mask(merge: bool) -> Mask {
        if merge {
            ALL_PERMISSIONS_MASK
        } else {
            ALL_PERMISSIONS_MASK_FULL
        }
    }

    /// Build an extended mask from permission names, e.g. `["READ", "NO_WRITE"]`.
    pub fn mask_of(names: &[&str]) -> AppResult<Mask> {
        let mask = names.iter().try_fold(0, |acc, name| {
            name.parse::<AclPermission>().map(|p| acc | p.mask())
        })?;
        Self::validate_mask(mask)?;
        Ok(mask)
    }
}
