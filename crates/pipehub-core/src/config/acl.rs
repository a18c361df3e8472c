//! Permission engine configuration.

use serde::{Deserialize, Serialize};

/// Limits and switches for ACL resolution and tree filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclConfig {
    /// Maximum hierarchy depth accepted by the tree filter.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// Maximum number of parent ACLs visited by one inheritance walk.
    #[serde(default = "default_max_inheritance_depth")]
    pub max_inheritance_depth: usize,
    /// Whether loaded ACLs are kept in the cache.
    #[serde(default = "default_true")]
    pub cache_acls: bool,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
            max_inheritance_depth: default_max_inheritance_depth(),
            cache_acls: default_true(),
        }
    }
}

fn default_max_tree_depth() -> usize {
    64
}

fn default_max_inheritance_depth() -> usize {
    32
}

fn default_true() -> bool {
    true
}
