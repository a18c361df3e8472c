//! Domain events emitted by PipeHub operations.
//!
//! Events are published after a permission mutation has been committed and
//! are consumed by [`EventSink`](crate::traits::EventSink) implementations.

pub mod permission;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use permission::PermissionEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if known).
    pub actor: Option<String>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A permission-related event.
    Permission(PermissionEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor: Option<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            actor,
            payload,
        }
    }

    /// Create a permission event without an actor.
    pub fn permission(event: PermissionEvent) -> Self {
        Self::new(None, EventPayload::Permission(event))
    }
}
