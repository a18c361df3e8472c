//! Cache key builders for all PipeHub cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use pipehub_core::types::AclId;
use pipehub_entity::permission::ObjectIdentity;

/// Prefix applied to all PipeHub cache keys.
const PREFIX: &str = "pipehub";

// ── ACL keys ───────────────────────────────────────────────

/// Cache key for an ACL by the object identity it secures.
pub fn acl_by_object(identity: &ObjectIdentity) -> String {
    format!(
        "{PREFIX}:acl:obj:{}:{}",
        identity.entity_type.as_str().to_lowercase(),
        identity.id
    )
}

/// Cache key for an ACL by its stored id.
pub fn acl_by_id(acl_id: AclId) -> String {
    format!("{PREFIX}:acl:id:{acl_id}")
}

/// Cache key holding the last committed version of an object's ACL.
pub fn acl_committed_version(identity: &ObjectIdentity) -> String {
    format!(
        "{PREFIX}:acl:ver:{}:{}",
        identity.entity_type.as_str().to_lowercase(),
        identity.id
    )
}
