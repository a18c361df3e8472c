//! ACL read-through cache.
//!
//! Every ACL is cached under two keys: its object identity and its stored
//! id. Cache failures are logged and otherwise ignored; the store stays the
//! source of truth.
//!
//! Eviction also records the committed version of the ACL. A reader that
//! fetched an older copy from the store before that commit cannot leave it
//! behind in the cache.

use std::sync::Arc;

use tracing::{debug, warn};

use pipehub_cache::keys;
use pipehub_cache::provider::CacheManager;
use pipehub_core::traits::CacheProvider;
use pipehub_entity::permission::{Acl, ObjectIdentity};

/// Cached copies of stored ACLs.
#[derive(Debug, Clone)]
pub struct AclCache {
    cache: Arc<CacheManager>,
}

impl AclCache {
    /// Wrap a cache manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    /// Cached ACL of an object.
    pub async fn get(&self, identity: &ObjectIdentity) -> Option<Acl> {
        let key = keys::acl_by_object(identity);
        match self.cache.get_json::<Acl>(&key).await {
            Ok(acl) => acl,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cached ACL");
                None
            }
        }
    }

    /// Cache an ACL read from the store. The copy is dropped again if a
    /// newer version was committed in the meantime.
    pub async fn put(&self, acl: &Acl) {
        for key in acl_keys(acl) {
            if let Err(e) = self.cache.set_json(&key, acl).await {
                warn!(key = %key, error = %e, "Failed to cache ACL");
            }
        }

        if self.committed_version(&acl.identity).await > Some(acl.version) {
            debug!(entity = %acl.identity, version = acl.version, "Dropping stale ACL copy");
            self.delete_copies(acl).await;
        }
    }

    /// Forget cached copies of a freshly committed ACL.
    pub async fn evict(&self, committed: &Acl) {
        let marker = keys::acl_committed_version(&committed.identity);
        if let Err(e) = self.cache.set(&marker, &committed.version.to_string()).await {
            warn!(key = %marker, error = %e, "Failed to record committed ACL version");
        }
        self.delete_copies(committed).await;
        debug!(
            entity = %committed.identity,
            acl_id = %committed.id,
            version = committed.version,
            "Evicted cached ACL"
        );
    }

    async fn delete_copies(&self, acl: &Acl) {
        for key in acl_keys(acl) {
            if let Err(e) = self.cache.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to evict cached ACL");
            }
        }
    }

    async fn committed_version(&self, identity: &ObjectIdentity) -> Option<u64> {
        let key = keys::acl_committed_version(identity);
        match self.cache.get(&key).await {
            Ok(version) => version.and_then(|v| v.parse().ok()),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read committed ACL version");
                None
            }
        }
    }
}

fn acl_keys(acl: &Acl) -> [String; 2] {
    [keys::acl_by_object(&acl.identity), keys::acl_by_id(acl.id)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipehub_core::config::cache::CacheConfig;
    use pipehub_core::types::AclId;
    use pipehub_entity::entity::EntityType;
    use pipehub_entity::permission::Sid;

    fn make_cache() -> AclCache {
        let manager = CacheManager::new(&CacheConfig::default()).unwrap();
        AclCache::new(Arc::new(manager))
    }

    fn make_acl(version: u64) -> Acl {
        let mut acl = Acl::new(
            AclId::new(7),
            ObjectIdentity::new(EntityType::Pipeline, 3),
            Sid::principal("alice"),
        )
        .with_entry(Sid::user_role(), 1);
        acl.version = version;
        acl
    }

    async fn cached_by_id(cache: &AclCache, acl: &Acl) -> Option<Acl> {
        cache.cache.get_json(&keys::acl_by_id(acl.id)).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_caches_under_both_keys() {
        let cache = make_cache();
        let acl = make_acl(1);
        cache.put(&acl).await;

        assert_eq!(cache.get(&acl.identity).await, Some(acl.clone()));
        assert_eq!(cached_by_id(&cache, &acl).await, Some(acl));
    }

    #[tokio::test]
    async fn test_evict_removes_both_keys() {
        let cache = make_cache();
        let acl = make_acl(1);
        cache.put(&acl).await;
        cache.evict(&acl).await;

        assert!(cache.get(&acl.identity).await.is_none());
        assert!(cached_by_id(&cache, &acl).await.is_none());
    }

    #[tokio::test]
    async fn test_copy_read_before_commit_is_not_kept() {
        let cache = make_cache();
        let read_before_commit = make_acl(1);
        let committed = make_acl(2);

        cache.evict(&committed).await;
        cache.put(&read_before_commit).await;
        assert!(cache.get(&committed.identity).await.is_none());
        assert!(cached_by_id(&cache, &committed).await.is_none());

        cache.put(&committed).await;
        assert_eq!(cache.get(&committed.identity).await, Some(committed));
    }
}
