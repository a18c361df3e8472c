//! Permission bits, security identifiers and ACL records.

pub mod mask;
pub mod model;
pub mod sid;

pub use mask::{
    ALL_PERMISSIONS_MASK, ALL_PERMISSIONS_MASK_FULL, AclPermission, BASIC_PERMISSIONS, Mask,
    NO_PERMISSIONS,
};
pub use model::{AccessControlEntry, Acl, ObjectIdentity};
pub use sid::{Authority, Sid};
