//! Permission mutations: grants, revocations, locking and ownership.
//!
//! Every mutation runs as one [`AclUnitOfWork`]: all touched ACLs are
//! written atomically, then cached copies are evicted and events published.

use std::sync::Arc;

use tracing::{debug, info};

use pipehub_core::error::AppError;
use pipehub_core::events::PermissionEvent;
use pipehub_core::result::AppResult;
use pipehub_database::AclStore;
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{Acl, AclPermission, Mask, ObjectIdentity, Sid};

use super::cache::AclCache;
use super::events::EventPublisher;
use super::mask::PermissionMaskService;
use super::unit_of_work::AclUnitOfWork;

/// Bits the lock overlay adds to the `ROLE_USER` entry.
const LOCK_OVERLAY: Mask = AclPermission::NoWrite.mask() | AclPermission::NoExecute.mask();

/// Grant bits the lock overlay displaces.
const LOCK_DISPLACED: Mask = AclPermission::Write.mask() | AclPermission::Execute.mask();

/// Applies permission mutations to the ACL store.
#[derive(Clone)]
pub struct GrantPermissionHandler {
    /// ACL store.
    store: Arc<dyn AclStore>,
    /// Cache evicted after each commit.
    cache: Option<Arc<AclCache>>,
    /// Event fan-out.
    publisher: EventPublisher,
}

impl std::fmt::Debug for GrantPermissionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantPermissionHandler")
            .field("cached", &self.cache.is_some())
            .field("sinks", &self.publisher.sink_count())
            .finish()
    }
}

impl GrantPermissionHandler {
    /// Creates a handler without cache or event sinks.
    pub fn new(store: Arc<dyn AclStore>) -> Self {
        Self {
            store,
            cache: None,
            publisher: EventPublisher::new(),
        }
    }

    /// Evict cached ACLs after commits.
    pub fn with_cache(mut self, cache: Arc<AclCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Publish committed changes.
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    fn begin(&self) -> AclUnitOfWork<'_> {
        AclUnitOfWork::new(self.store.as_ref(), self.cache.as_deref(), &self.publisher)
    }

    /// Create or replace the entry of a sid on an entity.
    ///
    /// A replaced entry keeps its position; a new one is inserted first.
    pub async fn set_permission(
        &self,
        entity: &SecuredEntity,
        sid_name: &str,
        is_principal: bool,
        mask: Mask,
    ) -> AppResult<Acl> {
        PermissionMaskService::validate_mask(mask)?;
        let identity = require_identity(entity)?;
        if sid_name.trim().is_empty() {
            return Err(AppError::validation("Sid name must not be empty"));
        }

        let sid = self.store.create_or_get_sid(sid_name, is_principal).await?;
        let mut acl = self.store.get_or_create_object_identity(entity).await?;
        let position = match acl.find_entry(&sid) {
            Some(position) => {
                acl.delete_entry(position);
                position
            }
            None => 0,
        };
        acl.insert_entry(position, sid.clone(), mask);

        let mut uow = self.begin();
        uow.stage(acl);
        uow.record(PermissionEvent::Granted {
            entity_type: identity.entity_type.as_str().to_string(),
            entity_id: identity.id.get(),
            sid: sid.name().to_string(),
            principal: sid.is_principal(),
            mask,
        });
        let stored = single(uow.commit().await?)?;

        info!(entity = %identity, sid = %sid, mask, position, "Permission set");
        Ok(stored)
    }

    /// Remove the entry of a sid. Returns the updated ACL, or `None` when
    /// the sid had no entry.
    pub async fn delete_permission(
        &self,
        entity: &SecuredEntity,
        sid_name: &str,
        is_principal: bool,
    ) -> AppResult<Option<Acl>> {
        let identity = require_identity(entity)?;
        if entity.locked {
            return Err(AppError::locked(format!(
                "{identity} is locked, permissions cannot be removed"
            )));
        }
        if self.store.get_sid_id(sid_name, is_principal).await?.is_none() {
            return Err(AppError::not_found(format!("Sid '{sid_name}' not found")));
        }

        let sid = Sid::from_parts(sid_name, is_principal);
        let Some(mut acl) = self.store.get_acl(&identity).await? else {
            debug!(entity = %identity, "No ACL, nothing to revoke");
            return Ok(None);
        };
        let Some(position) = acl.find_entry(&sid) else {
            debug!(entity = %identity, sid = %sid, "No entry, nothing to revoke");
            return Ok(None);
        };
        acl.delete_entry(position);

        let mut uow = self.begin();
        uow.stage(acl);
        uow.record(PermissionEvent::Revoked {
            entity_type: identity.entity_type.as_str().to_string(),
            entity_id: identity.id.get(),
            sid: sid.name().to_string(),
            principal: sid.is_principal(),
        });
        let stored = single(uow.commit().await?)?;

        info!(entity = %identity, sid = %sid, "Permission revoked");
        Ok(Some(stored))
    }

    /// Remove every entry of an entity. No write happens if there is none.
    pub async fn delete_all_permissions(&self, entity: &SecuredEntity) -> AppResult<()> {
        let identity = require_identity(entity)?;
        let Some(mut acl) = self.store.get_acl(&identity).await? else {
            return Ok(());
        };
        if !acl.clear_entries() {
            return Ok(());
        }

        let mut uow = self.begin();
        uow.stage(acl);
        uow.record(PermissionEvent::Cleared {
            entity_type: identity.entity_type.as_str().to_string(),
            entity_id: identity.id.get(),
        });
        uow.commit().await?;

        info!(entity = %identity, "All permissions removed");
        Ok(())
    }

    /// Lock an entity and everything below it.
    ///
    /// Each registered node keeps a single `ROLE_USER` entry denying WRITE
    /// and EXECUTE on top of its previous READ bits. The write and execute
    /// bits it had before are kept on the ACL until [`Self::unlock_entity`].
    /// All ACLs are written in one commit. Returns the number of ACLs written.
    pub async fn lock_entity(&self, entity: &mut SecuredEntity) -> AppResult<usize> {
        let user_role = self
            .store
            .create_or_get_sid(pipehub_entity::permission::sid::ROLE_USER, false)
            .await?;

        let mut uow = self.begin();
        let mut stack: Vec<&SecuredEntity> = vec![&*entity];
        while let Some(node) = stack.pop() {
            stack.extend(node.children.iter());
            stack.extend(node.leaves.iter());
            let Some(identity) = node.identity() else {
                continue;
            };

            let mut acl = self.store.get_or_create_object_identity(node).await?;
            let previous = acl.entry_for(&user_role).map(|ace| ace.mask).unwrap_or(0);
            let locked = (previous & !LOCK_DISPLACED) | LOCK_OVERLAY;
            PermissionMaskService::validate_mask(locked)?;

            // A relock keeps the bits saved by the first lock.
            if acl.pre_lock_mask.is_none() {
                acl.pre_lock_mask = Some(previous & (LOCK_DISPLACED | LOCK_OVERLAY));
            }
            acl.clear_entries();
            acl.insert_entry(0, user_role.clone(), locked);
            uow.stage(acl);
            uow.record(PermissionEvent::Locked {
                entity_type: identity.entity_type.as_str().to_string(),
                entity_id: identity.id.get(),
            });
        }

        let written = uow.commit().await?.len();
        mark_locked(entity, true);

        info!(
            entity_type = %entity.entity_type,
            entity_id = ?entity.id,
            acls = written,
            "Entity locked"
        );
        Ok(written)
    }

    /// Lift the lock overlay from an entity's `ROLE_USER` entry and restore
    /// the write and execute bits it carried before the lock. READ bits are
    /// kept; an entry left empty is removed.
    pub async fn unlock_entity(&self, entity: &mut SecuredEntity) -> AppResult<()> {
        let identity = require_identity(entity)?;
        let user_role = Sid::user_role();

        let acl = self.store.get_acl(&identity).await?;
        if let Some(mut acl) = acl {
            let saved = acl.pre_lock_mask.take();
            let position = acl.find_entry(&user_role);
            if position.is_some() || saved.is_some() {
                if let Some(position) = position {
                    // Bits granted while locked win over the saved ones.
                    let unlocked = PermissionMaskService::merge_parent_mask(
                        acl.entries[position].mask & !LOCK_OVERLAY,
                        saved.unwrap_or(0),
                    );
                    acl.delete_entry(position);
                    if unlocked != 0 {
                        acl.insert_entry(position, user_role, unlocked);
                    }
                }

                let mut uow = self.begin();
                uow.stage(acl);
                uow.record(PermissionEvent::Unlocked {
                    entity_type: identity.entity_type.as_str().to_string(),
                    entity_id: identity.id.get(),
                });
                uow.commit().await?;
            }
        }

        entity.locked = false;
        info!(entity = %identity, "Entity unlocked");
        Ok(())
    }

    /// Make `owner` the owner of an entity's ACL.
    pub async fn change_owner(&self, entity: &SecuredEntity, owner: &str) -> AppResult<Acl> {
        let identity = require_identity(entity)?;
        if owner.trim().is_empty() {
            return Err(AppError::validation("Owner name must not be empty"));
        }

        let mut acl = self.store.get_or_create_object_identity(entity).await?;
        acl.owner = self.store.create_or_get_sid(owner, true).await?;

        let mut uow = self.begin();
        uow.stage(acl);
        uow.record(PermissionEvent::OwnerChanged {
            entity_type: identity.entity_type.as_str().to_string(),
            entity_id: identity.id.get(),
            owner: owner.to_string(),
        });
        let stored = single(uow.commit().await?)?;

        info!(entity = %identity, owner, "Owner changed");
        Ok(stored)
    }

    /// Delete a sid together with every entry it holds. Returns the number
    /// of ACLs that lost an entry.
    pub async fn delete_sid(&self, sid_name: &str, is_principal: bool) -> AppResult<usize> {
        let sid_id = self
            .store
            .get_sid_id(sid_name, is_principal)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Sid '{sid_name}' not found")))?;
        let sid = Sid::from_parts(sid_name, is_principal);

        let acls = self.store.find_acls_by_sid(&sid).await?;
        let affected = acls.len();

        let mut uow = self.begin();
        for mut acl in acls {
            acl.entries.retain(|ace| ace.sid != sid);
            uow.stage(acl);
        }
        uow.delete_sid(sid_id);
        uow.record(PermissionEvent::SidDeleted {
            sid: sid.name().to_string(),
            principal: sid.is_principal(),
            affected_acls: affected,
        });
        uow.commit().await?;

        info!(sid = %sid, affected_acls = affected, "Sid deleted");
        Ok(affected)
    }
}

fn require_identity(entity: &SecuredEntity) -> AppResult<ObjectIdentity> {
    entity.identity().ok_or_else(|| {
        AppError::not_found(format!(
            "{} '{}' is not registered",
            entity.entity_type, entity.name
        ))
    })
}

fn single(mut stored: Vec<Acl>) -> AppResult<Acl> {
    stored
        .pop()
        .ok_or_else(|| AppError::internal("ACL commit returned no row"))
}

fn mark_locked(entity: &mut SecuredEntity, locked: bool) {
    let mut stack = vec![entity];
    while let Some(node) = stack.pop() {
        node.locked = locked;
        stack.extend(node.children.iter_mut());
        stack.extend(node.leaves.iter_mut());
    }
}
