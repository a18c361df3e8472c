//! Shared value types used across crates.

pub mod id;

pub use id::{AclId, EntityId, SidId};
