//! Sink for domain events published after committed mutations.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receives domain events.
///
/// Publishers treat a failing sink as non-fatal: the error is logged and
/// the remaining sinks still receive the event.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver one event.
    async fn publish(&self, event: &DomainEvent) -> AppResult<()>;
}
