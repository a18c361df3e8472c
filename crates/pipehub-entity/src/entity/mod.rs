//! Secured entities and their type tags.

pub mod kind;
pub mod model;

pub use kind::EntityType;
pub use model::SecuredEntity;
