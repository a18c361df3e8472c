//! Storage-specific facts that cap permissions regardless of ACL content.

pub mod mount;
pub mod quota;

pub use mount::NfsMountStatus;
pub use quota::{AppliedQuota, QuotaAction};
