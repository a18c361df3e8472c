//! Security identifiers of the calling user.

pub mod resolver;

pub use resolver::{AuthContext, SidResolver};
