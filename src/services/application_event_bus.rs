use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::models::EventEnvelope;

const DEFAULT_CAPACITY: usize = 128;

/// In-process fan-out of delivered feature events.
///
/// Listeners only see events whose write has committed and whose delivery
/// to the configured publisher succeeded.
#[derive(Debug, Clone)]
pub struct ApplicationEventBus {
    sender: broadcast::Sender<Arc<EventEnvelope>>,
}

impl Default for ApplicationEventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ApplicationEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventEnvelope>> {
        self.sender.subscribe()
    }

    /// Returns how many listeners received the event
    pub fn notify(&self, envelope: EventEnvelope) -> usize {
        match self.sender.send(Arc::new(envelope)) {
            Ok(receivers) => receivers,
            Err(_) => {
                // No listeners
                trace!("Dropping feature event with no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        models::{AuditInfo, Feature, FeatureEvent, FeatureStatus},
        value_objects::Code,
    };
    use chrono::Utc;

    fn envelope() -> EventEnvelope {
        let feature = Feature {
            id: 1,
            code: Code::new("F1").unwrap(),
            product_id: 1,
            product_code: Code::new("intellij").unwrap(),
            release_id: 1,
            release_code: Code::new("IDEA-2023.3.8").unwrap(),
            title: "Bus".to_string(),
            description: None,
            status: FeatureStatus::New,
            assigned_to: None,
            audit: AuditInfo::created("user", Utc::now()),
        };
        EventEnvelope::new(FeatureEvent::Created { feature }, Utc::now())
    }

    #[tokio::test]
    async fn test_notify_reaches_every_subscriber() {
        let bus = ApplicationEventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let sent = envelope();
        assert_eq!(bus.notify(sent.clone()), 2);

        assert_eq!(first.recv().await.unwrap().event_id, sent.event_id);
        assert_eq!(second.recv().await.unwrap().event_id, sent.event_id);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let bus = ApplicationEventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.notify(envelope()), 0);
    }
}
