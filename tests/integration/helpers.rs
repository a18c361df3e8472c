//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use pipehub_auth::{BroadcastEventSink, EventPublisher, PermissionEngine};
use pipehub_core::config::AppConfig;
use pipehub_core::error::AppError;
use pipehub_core::events::{DomainEvent, EventPayload, PermissionEvent};
use pipehub_core::result::AppResult;
use pipehub_core::types::{AclId, SidId};
use pipehub_database::{AclStore, MemoryAclRepository, MemoryQuotaRepository, QuotaOracle};
use pipehub_entity::entity::{EntityType, SecuredEntity};
use pipehub_entity::permission::{Acl, ObjectIdentity, Sid};
use pipehub_entity::storage::AppliedQuota;

/// Test application context
pub struct TestApp {
    /// The permission services under test
    pub engine: PermissionEngine,
    /// In-memory ACL store backing the engine
    pub store: Arc<MemoryAclRepository>,
    /// In-memory quota list backing the engine
    pub quotas: Arc<MemoryQuotaRepository>,
    /// Receiver of published permission events
    pub events: broadcast::Receiver<DomainEvent>,
}

impl TestApp {
    /// Create an application with an empty store
    pub fn new() -> Self {
        Self::with_acls(Vec::new())
    }

    /// Create an application seeded with ACLs
    pub fn with_acls(acls: Vec<Acl>) -> Self {
        let store = Arc::new(MemoryAclRepository::with_acls(acls));
        let quotas = Arc::new(MemoryQuotaRepository::default());
        let sink = Arc::new(BroadcastEventSink::new(64));
        let events = sink.subscribe();
        let engine = PermissionEngine::new(
            &AppConfig::default(),
            store.clone(),
            quotas.clone(),
            EventPublisher::new().with_sink(sink),
        )
        .expect("Failed to build permission engine");

        Self {
            engine,
            store,
            quotas,
            events,
        }
    }

    /// Apply a read-mode quota to a user
    pub async fn apply_read_mode_quota(&self, user: &str) {
        self.quotas
            .apply(AppliedQuota::read_mode(1, user, true))
            .await;
    }

    /// Drain the permission events published so far
    pub fn drain_events(&mut self) -> Vec<PermissionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            let EventPayload::Permission(event) = event.payload;
            drained.push(event);
        }
        drained
    }

    /// Stored ACL of an entity
    pub async fn acl_of(&self, entity: &SecuredEntity) -> Option<Acl> {
        let identity = entity.identity().expect("registered entity");
        self.store.get_acl(&identity).await.expect("store read")
    }
}

/// Build an engine over an arbitrary store
pub fn engine_over(store: Arc<dyn AclStore>, quotas: Arc<dyn QuotaOracle>) -> PermissionEngine {
    let mut config = AppConfig::default();
    config.acl.cache_acls = false;
    PermissionEngine::new(&config, store, quotas, EventPublisher::new())
        .expect("Failed to build permission engine")
}

/// Principal plus `ROLE_USER`
pub fn user(name: &str) -> Vec<Sid> {
    vec![Sid::principal(name), Sid::user_role()]
}

/// Principal plus the given authorities
pub fn user_in(name: &str, authorities: &[&str]) -> Vec<Sid> {
    std::iter::once(Sid::principal(name))
        .chain(authorities.iter().map(|a| Sid::authority(a)))
        .collect()
}

/// Folder identity
pub fn folder_id(id: i64) -> ObjectIdentity {
    ObjectIdentity::new(EntityType::Folder, id)
}

/// Registered folder owned by `owner`
pub fn folder(id: i64, owner: &str) -> SecuredEntity {
    SecuredEntity::new(EntityType::Folder, id, owner).with_name(format!("folder-{id}"))
}

/// Registered pipeline owned by `owner`
pub fn pipeline(id: i64, owner: &str) -> SecuredEntity {
    SecuredEntity::new(EntityType::Pipeline, id, owner).with_name(format!("pipeline-{id}"))
}

/// Empty ACL of a folder
pub fn folder_acl(id: i64, owner: &str) -> Acl {
    Acl::new(AclId::new(id), folder_id(id), Sid::principal(owner))
}

/// ACL store whose every call fails, as an unreachable database would
#[derive(Debug, Default)]
pub struct FailingStore;

fn unavailable<T>() -> AppResult<T> {
    Err(AppError::database("connection refused"))
}

#[async_trait]
impl AclStore for FailingStore {
    async fn get_acl(&self, _identity: &ObjectIdentity) -> AppResult<Option<Acl>> {
        unavailable()
    }

    async fn get_object_identities(
        &self,
        _identities: &[ObjectIdentity],
    ) -> AppResult<HashMap<ObjectIdentity, Acl>> {
        unavailable()
    }

    async fn get_or_create_object_identity(&self, _entity: &SecuredEntity) -> AppResult<Acl> {
        unavailable()
    }

    async fn apply_changes(
        &self,
        _acls: Vec<Acl>,
        _deleted_sids: &[SidId],
    ) -> AppResult<Vec<Acl>> {
        unavailable()
    }

    async fn find_acls_by_sid(&self, _sid: &Sid) -> AppResult<Vec<Acl>> {
        unavailable()
    }

    async fn create_or_get_sid(&self, _name: &str, _is_principal: bool) -> AppResult<Sid> {
        unavailable()
    }

    async fn get_sid_id(&self, _name: &str, _is_principal: bool) -> AppResult<Option<SidId>> {
        unavailable()
    }
}
