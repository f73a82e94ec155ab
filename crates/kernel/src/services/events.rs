//! Event sink contract and the tracing-backed default sink.

use async_trait::async_trait;
use tracing::{error, info};

use crate::models::DomainEvent;

/// Receives domain events in dispatch order.
///
/// Dispatch is fire-and-forget: sinks log their own failures.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn dispatch(&self, event: DomainEvent);
}

/// Sink that records every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn dispatch(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = %event.name(), %payload, "domain event"),
            Err(e) => error!(event = %event.name(), error = %e, "failed to serialize event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_sink_accepts_events() {
        TracingEventSink
            .dispatch(DomainEvent::Custom {
                name: "test".into(),
                payload: serde_json::json!({"ok": true}),
            })
            .await;
    }
}
