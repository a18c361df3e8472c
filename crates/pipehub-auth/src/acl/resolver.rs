//! Effective permission mask resolution.
//!
//! Resolution order for one entity and an ordered sid list:
//! 1. Admin bypass: `ROLE_ADMIN` gets the full mask.
//! 2. Owner check: the entity owner gets the full mask.
//! 3. ACL lookup: the entity's own ACL, or the parent's ACL when the entity
//!    has none. The ACL owner (or a storage admin on a storage) gets the
//!    full mask.
//! 4. Entry collection: per sid, per matching ACE, per unresolved permission,
//!    walking up inheriting parent ACLs until every permission is decided.
//! 5. Storage ceiling: read-only mounts and read-mode quotas cap storages
//!    at READ.
//!
//! Any store failure yields the empty mask.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use pipehub_core::config::acl::AclConfig;
use pipehub_core::error::AppError;
use pipehub_core::result::AppResult;
use pipehub_database::{AclStore, QuotaOracle};
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{
    Acl, AclPermission, Authority, BASIC_PERMISSIONS, Mask, NO_PERMISSIONS, ObjectIdentity, Sid,
};

use super::cache::AclCache;
use super::mask::PermissionMaskService;

/// Options of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Collapse the result into a simple mask.
    pub merge: bool,
    /// Consult parent ACLs for permissions the entity's ACL leaves open.
    pub include_inherited: bool,
    /// Known read-mode quota state of the caller; `None` asks the oracle.
    pub read_mode_quota: Option<bool>,
}

impl ResolveOptions {
    /// Simple mask, with inheritance.
    pub const fn merged() -> Self {
        Self {
            merge: true,
            include_inherited: true,
            read_mode_quota: None,
        }
    }

    /// Extended mask, with inheritance.
    pub const fn extended() -> Self {
        Self {
            merge: false,
            include_inherited: true,
            read_mode_quota: None,
        }
    }

    /// Toggle parent ACL lookup.
    pub const fn with_inherited(mut self, include_inherited: bool) -> Self {
        self.include_inherited = include_inherited;
        self
    }

    /// Supply the caller's read-mode quota state.
    pub const fn with_read_mode_quota(mut self, active: bool) -> Self {
        self.read_mode_quota = Some(active);
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::merged()
    }
}

/// One ACE as presented to auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    /// Sid of the entry.
    pub sid: Sid,
    /// Extended mask of the entry.
    pub mask: Mask,
    /// The entry's mask collapsed to simple bits.
    pub simple_mask: Mask,
    /// Decoded permission names.
    pub permissions: Vec<AclPermission>,
}

/// The ACL of one entity as presented to auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityPermissions {
    /// The entity.
    pub identity: ObjectIdentity,
    /// Owner sid.
    pub owner: Sid,
    /// Entries in precedence order.
    pub entries: Vec<PermissionEntry>,
    /// Parent the ACL inherits from.
    pub parent: Option<ObjectIdentity>,
    /// Whether parent entries apply.
    pub entries_inheriting: bool,
}

/// Resolves the effective permission mask of a sid set on an entity.
#[derive(Clone)]
pub struct PermissionResolver {
    /// ACL store.
    store: Arc<dyn AclStore>,
    /// Read-mode quota lookup.
    quotas: Arc<dyn QuotaOracle>,
    /// Optional ACL cache in front of the store.
    cache: Option<Arc<AclCache>>,
    /// Upper bound on parent ACL hops.
    max_inheritance_depth: usize,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cached", &self.cache.is_some())
            .field("max_inheritance_depth", &self.max_inheritance_depth)
            .finish()
    }
}

impl PermissionResolver {
    /// Creates a resolver without a cache.
    pub fn new(
        store: Arc<dyn AclStore>,
        quotas: Arc<dyn QuotaOracle>,
        config: &AclConfig,
    ) -> Self {
        Self {
            store,
            quotas,
            cache: None,
            max_inheritance_depth: config.max_inheritance_depth,
        }
    }

    /// Read ACLs through a cache.
    pub fn with_cache(mut self, cache: Arc<AclCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Effective mask of `sids` on `entity`. Never fails: an error while
    /// resolving yields the empty mask.
    pub async fn resolve(
        &self,
        entity: &SecuredEntity,
        sids: &[Sid],
        options: ResolveOptions,
    ) -> Mask {
        match self.try_resolve(entity, sids, options, None).await {
            Ok(mask) => mask,
            Err(e) => {
                warn!(
                    entity_type = %entity.entity_type,
                    entity_id = ?entity.id,
                    error = %e,
                    "Permission resolution failed, denying access"
                );
                NO_PERMISSIONS
            }
        }
    }

    /// Resolve many entities with one bulk ACL read.
    ///
    /// Unregistered entities are skipped. If the bulk read fails each
    /// entity is resolved on its own.
    pub async fn resolve_many(
        &self,
        entities: &[&SecuredEntity],
        sids: &[Sid],
        options: ResolveOptions,
    ) -> HashMap<ObjectIdentity, Mask> {
        let identities: Vec<ObjectIdentity> =
            entities.iter().filter_map(|e| e.identity()).collect();
        if identities.is_empty() {
            return HashMap::new();
        }

        let prefetched = match self.store.get_object_identities(&identities).await {
            Ok(acls) => Some(acls),
            Err(e) => {
                warn!(count = identities.len(), error = %e, "Bulk ACL read failed, resolving one by one");
                None
            }
        };

        let mut masks = HashMap::with_capacity(identities.len());
        for entity in entities {
            let Some(identity) = entity.identity() else {
                continue;
            };
            let mask = match &prefetched {
                Some(acls) => {
                    let acl = acls.get(&identity).cloned();
                    self.try_resolve(entity, sids, options, Some(acl))
                        .await
                        .unwrap_or_else(|e| {
                            warn!(entity = %identity, error = %e, "Permission resolution failed, denying access");
                            NO_PERMISSIONS
                        })
                }
                None => self.resolve(entity, sids, options).await,
            };
            masks.insert(identity, mask);
        }
        masks
    }

    /// Whether `sids` own `entity`, by entity owner or ACL owner.
    pub async fn is_owner(&self, entity: &SecuredEntity, sids: &[Sid]) -> bool {
        if Self::owns_by_name(entity, sids) {
            return true;
        }
        let Some(identity) = entity.identity() else {
            return false;
        };
        match self.load_acl(&identity).await {
            Ok(Some(acl)) => sids.iter().any(|sid| acl.is_owned_by(sid)),
            Ok(None) => false,
            Err(e) => {
                warn!(entity = %identity, error = %e, "Owner check failed");
                false
            }
        }
    }

    /// Whether `permission` is granted to `sids` on `entity`.
    pub async fn permission_granted(
        &self,
        entity: &SecuredEntity,
        permission: AclPermission,
        sids: &[Sid],
    ) -> bool {
        if permission == AclPermission::Owner {
            return Self::is_admin(sids) || self.is_owner(entity, sids).await;
        }
        let mask = self.resolve(entity, sids, ResolveOptions::extended()).await;
        PermissionMaskService::is_granted(mask, permission)
    }

    /// The stored ACL of an entity, decoded.
    pub async fn list_permissions(&self, entity: &SecuredEntity) -> AppResult<EntityPermissions> {
        let identity = entity.identity().ok_or_else(|| {
            AppError::not_found(format!("Unsaved {} has no permissions", entity.entity_type))
        })?;

        let permissions = match self.load_acl(&identity).await? {
            Some(acl) => EntityPermissions {
                identity,
                owner: acl.owner,
                entries: acl
                    .entries
                    .into_iter()
                    .map(|ace| PermissionEntry {
                        permissions: AclPermission::decode(ace.mask),
                        simple_mask: PermissionMaskService::merge_mask(ace.mask),
                        sid: ace.sid,
                        mask: ace.mask,
                    })
                    .collect(),
                parent: acl.parent,
                entries_inheriting: acl.entries_inheriting,
            },
            None => EntityPermissions {
                identity,
                owner: Sid::principal(entity.owner.clone()),
                entries: Vec::new(),
                parent: entity.parent,
                entries_inheriting: true,
            },
        };
        Ok(permissions)
    }

    /// Whether the caller has an active read-mode quota.
    pub async fn lookup_read_mode_quota(&self, sids: &[Sid]) -> AppResult<bool> {
        let user = sids
            .iter()
            .find(|sid| sid.is_principal())
            .map(Sid::name)
            .unwrap_or_default();
        let groups: Vec<String> = sids
            .iter()
            .filter(|sid| !sid.is_principal())
            .map(|sid| sid.name().to_string())
            .collect();

        let quota = self.quotas.find_active_read_mode_quota(user, &groups).await?;
        if let Some(quota) = &quota {
            debug!(quota_id = quota.id, subject = %quota.subject, "Read-mode quota active");
        }
        Ok(quota.is_some())
    }

    /// `prefetched` is `Some` when the entity's own ACL was already read
    /// (`Some(None)`: read, not registered).
    async fn try_resolve(
        &self,
        entity: &SecuredEntity,
        sids: &[Sid],
        options: ResolveOptions,
        prefetched: Option<Option<Acl>>,
    ) -> AppResult<Mask> {
        if Self::is_admin(sids) {
            return Ok(PermissionMaskService::full_mask(options.merge));
        }

        let mut mask = self
            .resolve_extended(entity, sids, options.include_inherited, prefetched)
            .await?;

        if entity.entity_type.is_storage() && self.storage_read_only(entity, sids, options).await? {
            mask = Self::read_only_ceiling(mask);
        }

        debug!(
            entity_type = %entity.entity_type,
            entity_id = ?entity.id,
            mask,
            "Resolved permission mask"
        );
        Ok(if options.merge {
            PermissionMaskService::merge_mask(mask)
        } else {
            mask
        })
    }

    async fn resolve_extended(
        &self,
        entity: &SecuredEntity,
        sids: &[Sid],
        include_inherited: bool,
        prefetched: Option<Option<Acl>>,
    ) -> AppResult<Mask> {
        if Self::owns_by_name(entity, sids) {
            return Ok(PermissionMaskService::full_mask(false));
        }

        let own = match prefetched {
            Some(acl) => acl,
            None => match entity.identity() {
                Some(identity) => self.load_acl(&identity).await?,
                None => None,
            },
        };

        let acl = match own {
            Some(acl) => acl,
            None => {
                let Some(parent) = entity.parent else {
                    return Ok(NO_PERMISSIONS);
                };
                match self.load_acl(&parent).await? {
                    Some(acl) => acl,
                    None => return Ok(NO_PERMISSIONS),
                }
            }
        };

        let storage_admin = entity.entity_type.is_storage()
            && sids
                .iter()
                .any(|sid| sid.is_authority(&Authority::StorageAdmin));
        if storage_admin || sids.iter().any(|sid| acl.is_owned_by(sid)) {
            return Ok(PermissionMaskService::full_mask(false));
        }

        self.collect_permissions(acl, sids, include_inherited).await
    }

    /// Walk the ACL and its inheriting ancestors until every basic
    /// permission is decided or the chain ends.
    async fn collect_permissions(
        &self,
        acl: Acl,
        sids: &[Sid],
        include_inherited: bool,
    ) -> AppResult<Mask> {
        let mut mask = NO_PERMISSIONS;
        let mut visited = HashSet::new();
        let mut current = acl;

        loop {
            visited.insert(current.identity);
            mask = collect_entries(mask, &current, sids);

            if PermissionMaskService::is_complete(mask)
                || !include_inherited
                || !current.entries_inheriting
            {
                return Ok(mask);
            }
            let Some(parent) = current.parent else {
                return Ok(mask);
            };
            if visited.contains(&parent) {
                warn!(entity = %current.identity, parent = %parent, "ACL inheritance cycle");
                return Ok(mask);
            }
            if visited.len() > self.max_inheritance_depth {
                warn!(
                    entity = %current.identity,
                    depth = visited.len(),
                    "ACL inheritance chain exceeds maximum depth"
                );
                return Ok(mask);
            }
            match self.load_acl(&parent).await? {
                Some(acl) => current = acl,
                None => return Ok(mask),
            }
        }
    }

    async fn storage_read_only(
        &self,
        entity: &SecuredEntity,
        sids: &[Sid],
        options: ResolveOptions,
    ) -> AppResult<bool> {
        if entity.mount_status.is_some_and(|status| status.is_read_only()) {
            return Ok(true);
        }
        match options.read_mode_quota {
            Some(active) => Ok(active),
            None => self.lookup_read_mode_quota(sids).await,
        }
    }

    /// Keep READ as resolved, deny WRITE and EXECUTE. READ is never added,
    /// so a write-only grant resolves to no access.
    fn read_only_ceiling(mask: Mask) -> Mask {
        (mask & AclPermission::Read.pair_mask())
            | AclPermission::NoWrite.mask()
            | AclPermission::NoExecute.mask()
    }

    async fn load_acl(&self, identity: &ObjectIdentity) -> AppResult<Option<Acl>> {
        if let Some(cache) = &self.cache {
            if let Some(acl) = cache.get(identity).await {
                return Ok(Some(acl));
            }
        }
        let acl = self.store.get_acl(identity).await?;
        if let (Some(cache), Some(acl)) = (&self.cache, &acl) {
            cache.put(acl).await;
        }
        Ok(acl)
    }

    fn is_admin(sids: &[Sid]) -> bool {
        sids.iter().any(|sid| sid.is_authority(&Authority::Admin))
    }

    fn owns_by_name(entity: &SecuredEntity, sids: &[Sid]) -> bool {
        !entity.owner.is_empty() && sids.iter().any(|sid| sid.is_user(&entity.owner))
    }
}

/// OR the bits of every ACE matching `sids` into `mask`, one permission at
/// a time: the first entry to decide a permission wins. Sids are consulted
/// in caller order, entries in ACL order.
fn collect_entries(mut mask: Mask, acl: &Acl, sids: &[Sid]) -> Mask {
    for sid in sids {
        for ace in acl.entries.iter().filter(|ace| &ace.sid == sid) {
            for permission in BASIC_PERMISSIONS {
                if !PermissionMaskService::is_permission_set(mask, permission) {
                    mask |= ace.mask & permission.pair_mask();
                }
            }
            mask |= ace.mask & AclPermission::Owner.mask();
            if PermissionMaskService::is_complete(mask) {
                return mask;
            }
        }
    }
    mask
}
