//! Publishes domain events to NATS.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::events::DomainEvent;

/// Fan-out for domain events raised by the aggregates.
///
/// Without a NATS client events are only logged. A recording bus keeps them in
/// memory so callers can inspect what was raised.
#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
    recorded: Option<Arc<Mutex<Vec<DomainEvent>>>>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats, recorded: None }
    }

    pub fn recording() -> Self {
        Self { nats: None, recorded: Some(Arc::default()) }
    }

    pub async fn recorded(&self) -> Vec<DomainEvent> {
        match &self.recorded {
            Some(events) => events.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Publishing is best effort: failures are logged and never fail the caller.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            tracing::debug!(%subject, ?event, "Publishing domain event");
            if let Some(nats) = &self.nats {
                match serde_json::to_vec(&event) {
                    Ok(payload) => {
                        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
                            tracing::warn!(%subject, error = %e, "Failed to publish event");
                        }
                    }
                    Err(e) => tracing::warn!(%subject, error = %e, "Failed to encode event"),
                }
            }
            if let Some(recorded) = &self.recorded {
                recorded.lock().await.push(event);
            }
        }
    }
}
