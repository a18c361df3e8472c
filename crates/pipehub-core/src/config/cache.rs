//! ACL cache configuration.

use serde::{Deserialize, Serialize};

/// Cache backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend name; only `"memory"` is built in.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Seconds an entry lives before it expires.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Upper bound on the number of cached entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_max_entries() -> u64 {
    10_000
}
