//! # pipehub-database
//!
//! Persistence boundary of the permission engine: the ACL store and quota
//! oracle contracts, and in-memory implementations that honour the same
//! atomicity and versioning rules a relational backend would.

pub mod repositories;

pub use repositories::acl::{AclStore, MemoryAclRepository};
pub use repositories::quota::{MemoryQuotaRepository, QuotaOracle};
