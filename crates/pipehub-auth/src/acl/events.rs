//! Publishing of permission events to registered sinks.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use pipehub_core::events::{DomainEvent, PermissionEvent};
use pipehub_core::result::AppResult;
use pipehub_core::traits::EventSink;

/// Fans committed permission events out to every registered sink.
///
/// A failing sink is logged and skipped: events are published after the
/// mutation is durable, so delivery problems never fail the mutation.
#[derive(Debug, Clone, Default)]
pub struct EventPublisher {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventPublisher {
    /// Publisher without sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Publish events in order to every sink.
    pub async fn publish_all(&self, events: Vec<PermissionEvent>) {
        for event in events {
            let event = DomainEvent::permission(event);
            for sink in &self.sinks {
                if let Err(e) = sink.publish(&event).await {
                    warn!(event_id = %event.id, error = %e, "Failed to publish permission event");
                }
            }
        }
    }
}

/// In-process sink backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventSink {
    /// Creates a sink buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        // No receivers is not an error.
        if self.sender.send(event.clone()).is_err() {
            debug!(event_id = %event.id, "No subscribers for permission event");
        }
        Ok(())
    }
}
