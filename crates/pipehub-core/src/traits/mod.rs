//! Core traits defined in `pipehub-core` and implemented by other crates.

pub mod cache;
pub mod event_sink;

pub use cache::CacheProvider;
pub use event_sink::EventSink;
