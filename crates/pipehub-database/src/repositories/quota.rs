//! Quota oracle contract and in-memory repository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use pipehub_core::result::AppResult;
use pipehub_entity::storage::AppliedQuota;

/// Source of quotas currently in effect.
///
/// Consulted only for storage-class entities.
#[async_trait]
pub trait QuotaOracle: Send + Sync + std::fmt::Debug + 'static {
    /// The first active read-mode quota applied to the user or to one of
    /// their groups.
    async fn find_active_read_mode_quota(
        &self,
        user: &str,
        groups: &[String],
    ) -> AppResult<Option<AppliedQuota>>;
}

/// In-memory list of applied quotas.
#[derive(Debug, Default)]
pub struct MemoryQuotaRepository {
    quotas: RwLock<Vec<AppliedQuota>>,
}

impl MemoryQuotaRepository {
    /// Create a repository holding the given quotas.
    pub fn new(quotas: Vec<AppliedQuota>) -> Self {
        Self {
            quotas: RwLock::new(quotas),
        }
    }

    /// Apply a quota.
    pub async fn apply(&self, quota: AppliedQuota) {
        self.quotas.write().await.push(quota);
    }

    /// Lift a quota by id. Returns `true` if it was applied.
    pub async fn lift(&self, quota_id: i64) -> bool {
        let mut quotas = self.quotas.write().await;
        let before = quotas.len();
        quotas.retain(|q| q.id != quota_id);
        quotas.len() != before
    }
}

#[async_trait]
impl QuotaOracle for MemoryQuotaRepository {
    async fn find_active_read_mode_quota(
        &self,
        user: &str,
        groups: &[String],
    ) -> AppResult<Option<AppliedQuota>> {
        let quotas = self.quotas.read().await;
        Ok(quotas
            .iter()
            .filter(|q| q.is_read_mode())
            .find(|q| {
                if q.principal {
                    q.subject.eq_ignore_ascii_case(user)
                } else {
                    groups.iter().any(|g| g == &q.subject)
                }
            })
            .cloned())
    }
}
