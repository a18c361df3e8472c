//! Repository contracts and implementations.

pub mod acl;
pub mod quota;
