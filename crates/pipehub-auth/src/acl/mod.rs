//! Access control lists: mask algebra, resolution with inheritance, tree
//! filtering and mutation.

pub mod cache;
pub mod events;
pub mod filter;
pub mod grant;
pub mod mask;
pub mod resolver;
pub mod unit_of_work;

pub use cache::AclCache;
pub use events::{BroadcastEventSink, EventPublisher};
pub use filter::HierarchyFilter;
pub use grant::GrantPermissionHandler;
pub use mask::PermissionMaskService;
pub use resolver::{EntityPermissions, PermissionEntry, PermissionResolver, ResolveOptions};
pub use unit_of_work::AclUnitOfWork;
