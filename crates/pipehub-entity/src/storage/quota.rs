//! Applied quota value object.

use serde::{Deserialize, Serialize};

/// Action a quota enforces once its threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaAction {
    /// Notify only.
    Notify,
    /// Switch storages to read-only mode.
    ReadMode,
    /// Refuse new compute jobs.
    DisableNewJobs,
    /// Stop running jobs.
    StopJobs,
    /// Block the subject.
    Block,
}

/// A quota currently in effect for a user or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedQuota {
    /// Quota ID.
    pub id: i64,
    /// User or group name the quota is applied to.
    pub subject: String,
    /// Whether `subject` is a user name.
    pub principal: bool,
    /// Enforced actions.
    pub actions: Vec<QuotaAction>,
}

impl AppliedQuota {
    /// Create a quota enforcing read mode.
    pub fn read_mode(id: i64, subject: impl Into<String>, principal: bool) -> Self {
        Self {
            id,
            subject: subject.into(),
            principal,
            actions: vec![QuotaAction::ReadMode],
        }
    }

    /// Whether the quota forces storages into read-only mode.
    pub fn is_read_mode(&self) -> bool {
        self.actions.contains(&QuotaAction::ReadMode)
    }
}
