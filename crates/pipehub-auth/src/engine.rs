//! Wiring of resolver, filter and grant handler from configuration.

use std::sync::Arc;

use tracing::info;

use pipehub_cache::provider::CacheManager;
use pipehub_core::config::AppConfig;
use pipehub_core::result::AppResult;
use pipehub_database::{AclStore, QuotaOracle};

use crate::acl::{
    AclCache, EventPublisher, GrantPermissionHandler, HierarchyFilter, PermissionResolver,
};

/// The permission services sharing one store, quota oracle and cache.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    resolver: Arc<PermissionResolver>,
    filter: HierarchyFilter,
    grants: GrantPermissionHandler,
    cache: Option<Arc<AclCache>>,
}

impl PermissionEngine {
    /// Build the services. The ACL cache is created only when
    /// `acl.cache_acls` is enabled.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn AclStore>,
        quotas: Arc<dyn QuotaOracle>,
        publisher: EventPublisher,
    ) -> AppResult<Self> {
        let cache = if config.acl.cache_acls {
            let manager = CacheManager::new(&config.cache)?;
            Some(Arc::new(AclCache::new(Arc::new(manager))))
        } else {
            None
        };

        let mut resolver = PermissionResolver::new(store.clone(), quotas, &config.acl);
        let mut grants = GrantPermissionHandler::new(store).with_publisher(publisher);
        if let Some(cache) = &cache {
            resolver = resolver.with_cache(cache.clone());
            grants = grants.with_cache(cache.clone());
        }
        let resolver = Arc::new(resolver);
        let filter = HierarchyFilter::new(resolver.clone(), &config.acl);

        info!(
            cache = cache.is_some(),
            max_tree_depth = config.acl.max_tree_depth,
            max_inheritance_depth = config.acl.max_inheritance_depth,
            "Permission engine initialized"
        );

        Ok(Self {
            resolver,
            filter,
            grants,
            cache,
        })
    }

    /// Mask resolution.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Tree filtering.
    pub fn filter(&self) -> &HierarchyFilter {
        &self.filter
    }

    /// Permission mutations.
    pub fn grants(&self) -> &GrantPermissionHandler {
        &self.grants
    }

    /// The shared ACL cache, if enabled.
    pub fn cache(&self) -> Option<&AclCache> {
        self.cache.as_deref()
    }
}
