//! Offline snapshot of ACLs, an entity tree and applied quotas.
//!
//! The CLI answers permission questions against a JSON snapshot instead of
//! a live backend:
//!
//! ```json
//! {
//!   "acls":   [{ "id": 1, "identity": { "entity_type": "FOLDER", "id": 1 },
//!                "owner": { "name": "admin", "principal": true },
//!                "entries": [{ "sid": { "name": "ROLE_USER", "principal": false }, "mask": 1 }] }],
//!   "tree":   { "id": 1, "entity_type": "FOLDER", "owner": "admin", "children": [], "leaves": [] },
//!   "quotas": [{ "id": 1, "subject": "bob", "principal": true, "actions": ["READ_MODE"] }]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use pipehub_auth::{EventPublisher, PermissionEngine};
use pipehub_core::config::AppConfig;
use pipehub_core::error::{AppError, ErrorKind};
use pipehub_core::result::AppResult;
use pipehub_database::{MemoryAclRepository, MemoryQuotaRepository};
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{Acl, ObjectIdentity};
use pipehub_entity::storage::AppliedQuota;

/// A captured permission snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Stored ACLs.
    #[serde(default)]
    pub acls: Vec<Acl>,
    /// Entity hierarchy.
    pub tree: SecuredEntity,
    /// Quotas in effect.
    #[serde(default)]
    pub quotas: Vec<AppliedQuota>,
}

impl Fixture {
    /// Read a snapshot from a JSON file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Io,
                format!("Failed to read fixture '{}'", path.display()),
                e,
            )
        })?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            acls = fixture.acls.len(),
            entities = fixture.tree.subtree_size(),
            quotas = fixture.quotas.len(),
            "Loaded permission fixture"
        );
        Ok(fixture)
    }

    /// Permission services backed by in-memory copies of the snapshot.
    pub fn engine(&self, config: &AppConfig) -> AppResult<PermissionEngine> {
        PermissionEngine::new(
            config,
            Arc::new(MemoryAclRepository::with_acls(self.acls.clone())),
            Arc::new(MemoryQuotaRepository::new(self.quotas.clone())),
            EventPublisher::new(),
        )
    }

    /// Entity of the tree with the given identity.
    pub fn entity(&self, identity: &ObjectIdentity) -> AppResult<&SecuredEntity> {
        self.tree
            .find(identity)
            .ok_or_else(|| AppError::not_found(format!("Entity {identity} not in fixture")))
    }
}
