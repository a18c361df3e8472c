//! # pipehub-cache
//!
//! Cache provider implementations for PipeHub. The in-process provider is
//! backed by [moka](https://crates.io/crates/moka); the provider is
//! selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;

pub use provider::CacheManager;
