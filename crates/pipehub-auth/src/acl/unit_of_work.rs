//! Unit of work for ACL mutations.
//!
//! A mutation stages every ACL it touches and commits them with one atomic
//! store call. Only after the store accepted the batch are cached copies
//! evicted and events published, so readers never see a cache entry newer
//! than the store and subscribers never hear of a change that was rolled
//! back.

use tracing::{info, warn};

use pipehub_core::events::PermissionEvent;
use pipehub_core::result::AppResult;
use pipehub_core::types::SidId;
use pipehub_database::AclStore;
use pipehub_entity::permission::{Acl, ObjectIdentity};

use super::cache::AclCache;
use super::events::EventPublisher;

/// Staged ACL changes awaiting one commit.
pub struct AclUnitOfWork<'a> {
    store: &'a dyn AclStore,
    cache: Option<&'a AclCache>,
    publisher: &'a EventPublisher,
    staged: Vec<Acl>,
    sid_deletions: Vec<SidId>,
    events: Vec<PermissionEvent>,
}

impl std::fmt::Debug for AclUnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclUnitOfWork")
            .field("staged", &self.staged.len())
            .field("sid_deletions", &self.sid_deletions)
            .field("events", &self.events.len())
            .finish()
    }
}

impl<'a> AclUnitOfWork<'a> {
    /// Begins a unit of work.
    pub fn new(
        store: &'a dyn AclStore,
        cache: Option<&'a AclCache>,
        publisher: &'a EventPublisher,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            staged: Vec::new(),
            sid_deletions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Stage an ACL, replacing an earlier staged copy of the same object.
    pub fn stage(&mut self, acl: Acl) {
        match self
            .staged
            .iter_mut()
            .find(|staged| staged.identity == acl.identity)
        {
            Some(staged) => *staged = acl,
            None => self.staged.push(acl),
        }
    }

    /// The staged copy of an object's ACL.
    pub fn staged(&self, identity: &ObjectIdentity) -> Option<&Acl> {
        self.staged.iter().find(|acl| &acl.identity == identity)
    }

    /// Delete a sid once the staged ACLs are stored.
    pub fn delete_sid(&mut self, id: SidId) {
        self.sid_deletions.push(id);
    }

    /// Record an event to publish on commit.
    pub fn record(&mut self, event: PermissionEvent) {
        self.events.push(event);
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.sid_deletions.is_empty()
    }

    /// Store the staged ACLs and delete the staged sids in one atomic store
    /// call, then evict cached copies and publish the recorded events.
    /// Returns the stored ACLs.
    ///
    /// On a store failure nothing is written, evicted or published.
    pub async fn commit(self) -> AppResult<Vec<Acl>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let count = self.staged.len();
        let stored = self
            .store
            .apply_changes(self.staged, &self.sid_deletions)
            .await
            .inspect_err(|e| {
                warn!(
                    count,
                    sids = self.sid_deletions.len(),
                    error = %e,
                    "ACL commit rejected"
                )
            })?;

        if let Some(cache) = self.cache {
            for acl in &stored {
                cache.evict(acl).await;
            }
        }

        info!(
            acls = stored.len(),
            sids_deleted = self.sid_deletions.len(),
            events = self.events.len(),
            "Committed ACL changes"
        );
        self.publisher.publish_all(self.events).await;
        Ok(stored)
    }
}
