//! # pipehub-auth
//!
//! ACL permission resolution and hierarchy filtering for the PipeHub
//! resource platform.
//!
//! ## Modules
//!
//! - `acl`: mask algebra, effective mask resolution, tree filtering,
//!   permission mutation, ACL caching and the mutation unit of work
//! - `sid`: the ordered sid list of an authenticated caller
//! - `engine`: wiring of the above from configuration

pub mod acl;
pub mod engine;
pub mod sid;

pub use acl::{
    AclCache, AclUnitOfWork, BroadcastEventSink, EventPublisher, GrantPermissionHandler,
    HierarchyFilter, PermissionMaskService, PermissionResolver, ResolveOptions,
};
pub use engine::PermissionEngine;
pub use sid::{AuthContext, SidResolver};
