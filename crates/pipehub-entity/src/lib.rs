//! # pipehub-entity
//!
//! Domain models for the PipeHub permission engine. Every struct in this
//! crate is a plain value object: permission bits, security identifiers,
//! ACL records keyed by object identity, and the secured-entity tree the
//! hierarchy filter prunes.

pub mod entity;
pub mod permission;
pub mod storage;
