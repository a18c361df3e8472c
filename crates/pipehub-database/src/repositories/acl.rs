//! ACL store contract and in-memory repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use pipehub_core::error::AppError;
use pipehub_core::result::AppResult;
use pipehub_core::types::{AclId, SidId};
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{Acl, ObjectIdentity, Sid};

/// Storage of ACL rows and sids.
///
/// ACLs form an arena keyed by [`ObjectIdentity`]; a parent ACL is a key,
/// not an owned reference. Implementations serialize concurrent writers to
/// one ACL with the `version` field: an update whose version does not match
/// the stored one fails with a `Conflict` error.
#[async_trait]
pub trait AclStore: Send + Sync + std::fmt::Debug + 'static {
    /// Load the ACL of an object, if it is registered.
    async fn get_acl(&self, identity: &ObjectIdentity) -> AppResult<Option<Acl>>;

    /// Bulk-load the ACLs of many objects. Unregistered objects are absent
    /// from the returned map.
    async fn get_object_identities(
        &self,
        identities: &[ObjectIdentity],
    ) -> AppResult<HashMap<ObjectIdentity, Acl>>;

    /// Load the ACL of an entity or build a new, not yet stored, one owned
    /// by the entity owner and inheriting from the entity parent.
    async fn get_or_create_object_identity(&self, entity: &SecuredEntity) -> AppResult<Acl>;

    /// Persist one ACL and return the stored copy.
    async fn update_acl(&self, acl: Acl) -> AppResult<Acl> {
        let mut stored = self.update_acls(vec![acl]).await?;
        stored
            .pop()
            .ok_or_else(|| AppError::internal("ACL store returned no row for update"))
    }

    /// Persist several ACLs atomically: either every ACL is written or none.
    async fn update_acls(&self, acls: Vec<Acl>) -> AppResult<Vec<Acl>> {
        self.apply_changes(acls, &[]).await
    }

    /// Persist ACLs and delete sids as one atomic change: if any ACL
    /// conflicts or any sid is unknown, nothing is written.
    async fn apply_changes(
        &self,
        acls: Vec<Acl>,
        deleted_sids: &[SidId],
    ) -> AppResult<Vec<Acl>>;

    /// All ACLs holding an entry for `sid`.
    async fn find_acls_by_sid(&self, sid: &Sid) -> AppResult<Vec<Acl>>;

    /// Register a sid (no-op if it exists) and return it.
    async fn create_or_get_sid(&self, name: &str, is_principal: bool) -> AppResult<Sid>;

    /// Stored id of a sid, if it exists.
    async fn get_sid_id(&self, name: &str, is_principal: bool) -> AppResult<Option<SidId>>;

    /// Delete a sid by its stored id.
    async fn delete_sid_by_id(&self, id: SidId) -> AppResult<()> {
        self.apply_changes(Vec::new(), &[id]).await.map(|_| ())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    acls: HashMap<ObjectIdentity, Acl>,
    sids: HashMap<(String, bool), SidId>,
}

/// In-memory ACL repository.
#[derive(Debug)]
pub struct MemoryAclRepository {
    state: RwLock<StoreState>,
    next_acl_id: AtomicI64,
    next_sid_id: AtomicI64,
}

impl Default for MemoryAclRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAclRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            next_acl_id: AtomicI64::new(1),
            next_sid_id: AtomicI64::new(1),
        }
    }

    /// Create a repository pre-populated with ACLs (e.g. a captured fixture).
    ///
    /// Seeded rows keep their ids and versions; their sids are registered.
    pub fn with_acls(acls: impl IntoIterator<Item = Acl>) -> Self {
        let mut repo = Self::new();
        let mut state = StoreState::default();
        let mut max_id = 0;
        for acl in acls {
            max_id = max_id.max(acl.id.get());
            repo.register_sid(&mut state, &acl.owner);
            for ace in &acl.entries {
                repo.register_sid(&mut state, &ace.sid);
            }
            state.acls.insert(acl.identity, acl);
        }
        repo.next_acl_id.store(max_id + 1, Ordering::SeqCst);
        repo.state = RwLock::new(state);
        repo
    }

    /// Number of stored ACLs.
    pub async fn len(&self) -> usize {
        self.state.read().await.acls.len()
    }

    /// Whether no ACL is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn register_sid(&self, state: &mut StoreState, sid: &Sid) -> SidId {
        *state
            .sids
            .entry((sid.name().to_string(), sid.is_principal()))
            .or_insert_with(|| SidId::new(self.next_sid_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl AclStore for MemoryAclRepository {
    async fn get_acl(&self, identity: &ObjectIdentity) -> AppResult<Option<Acl>> {
        Ok(self.state.read().await.acls.get(identity).cloned())
    }

    async fn get_object_identities(
        &self,
        identities: &[ObjectIdentity],
    ) -> AppResult<HashMap<ObjectIdentity, Acl>> {
        let state = self.state.read().await;
        Ok(identities
            .iter()
            .filter_map(|identity| {
                state
                    .acls
                    .get(identity)
                    .map(|acl| (*identity, acl.clone()))
            })
            .collect())
    }

    async fn get_or_create_object_identity(&self, entity: &SecuredEntity) -> AppResult<Acl> {
        let identity = entity.identity().ok_or_else(|| {
            AppError::not_found(format!(
                "Cannot register permissions for an unsaved {}",
                entity.entity_type
            ))
        })?;

        if let Some(acl) = self.get_acl(&identity).await? {
            return Ok(acl);
        }

        let owner = self.create_or_get_sid(&entity.owner, true).await?;
        let id = AclId::new(self.next_acl_id.fetch_add(1, Ordering::SeqCst));
        let mut acl = Acl::new(id, identity, owner);
        acl.parent = entity.parent;
        debug!(entity = %identity, acl_id = %id, "Prepared new ACL");
        Ok(acl)
    }

    async fn apply_changes(
        &self,
        acls: Vec<Acl>,
        deleted_sids: &[SidId],
    ) -> AppResult<Vec<Acl>> {
        let mut state = self.state.write().await;

        for acl in &acls {
            let stored_version = state.acls.get(&acl.identity).map(|stored| stored.version);
            match stored_version {
                Some(version) if version != acl.version => {
                    return Err(AppError::conflict(format!(
                        "ACL of {} was modified concurrently (stored version {version}, update based on {})",
                        acl.identity, acl.version
                    )));
                }
                None if acl.version != 0 => {
                    return Err(AppError::conflict(format!(
                        "ACL of {} was deleted concurrently",
                        acl.identity
                    )));
                }
                _ => {}
            }
        }
        if let Some(missing) = deleted_sids
            .iter()
            .find(|id| !state.sids.values().any(|stored| stored == *id))
        {
            return Err(AppError::not_found(format!("Sid {missing} not found")));
        }

        let mut stored = Vec::with_capacity(acls.len());
        for mut acl in acls {
            self.register_sid(&mut state, &acl.owner);
            for ace in &acl.entries {
                self.register_sid(&mut state, &ace.sid);
            }
            acl.version += 1;
            state.acls.insert(acl.identity, acl.clone());
            stored.push(acl);
        }
        state.sids.retain(|_, id| !deleted_sids.contains(id));

        debug!(
            count = stored.len(),
            sids_deleted = deleted_sids.len(),
            "Committed ACL batch"
        );
        Ok(stored)
    }

    async fn find_acls_by_sid(&self, sid: &Sid) -> AppResult<Vec<Acl>> {
        let state = self.state.read().await;
        let mut acls: Vec<Acl> = state
            .acls
            .values()
            .filter(|acl| acl.find_entry(sid).is_some())
            .cloned()
            .collect();
        acls.sort_by_key(|acl| acl.id);
        Ok(acls)
    }

    async fn create_or_get_sid(&self, name: &str, is_principal: bool) -> AppResult<Sid> {
        let sid = Sid::from_parts(name, is_principal);
        let mut state = self.state.write().await;
        self.register_sid(&mut state, &sid);
        Ok(sid)
    }

    async fn get_sid_id(&self, name: &str, is_principal: bool) -> AppResult<Option<SidId>> {
        let sid = Sid::from_parts(name, is_principal);
        let state = self.state.read().await;
        Ok(state
            .sids
            .get(&(sid.name().to_string(), sid.is_principal()))
            .copied())
    }
}
