use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{EventEnvelope, FeatureEventKind},
    },
    ports::events::{BrokerTransport, EventPublisher},
};

/// Topic names for each kind of feature event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChannels {
    pub new_features: String,
    pub updated_features: String,
    pub deleted_features: String,
}

impl Default for EventChannels {
    fn default() -> Self {
        Self {
            new_features: "new_features".to_string(),
            updated_features: "updated_features".to_string(),
            deleted_features: "deleted_features".to_string(),
        }
    }
}

impl EventChannels {
    pub fn channel_for(&self, kind: FeatureEventKind) -> &str {
        match kind {
            FeatureEventKind::Created => &self.new_features,
            FeatureEventKind::Updated => &self.updated_features,
            FeatureEventKind::Deleted => &self.deleted_features,
        }
    }
}

/// Publisher for the `BROKER` mode: events go to an external pub/sub transport,
/// keyed by feature code so one feature's events stay ordered
#[derive(Clone)]
pub struct BrokerEventPublisher {
    transport: Arc<dyn BrokerTransport>,
    channels: EventChannels,
}

impl BrokerEventPublisher {
    pub fn new(transport: Arc<dyn BrokerTransport>, channels: EventChannels) -> Self {
        Self {
            transport,
            channels,
        }
    }
}

#[async_trait]
impl EventPublisher for BrokerEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> TrackerResult<()> {
        let topic = self.channels.channel_for(envelope.event.kind());
        let key = envelope.event.feature().code.as_str();
        let payload =
            serde_json::to_value(envelope).map_err(|e| TrackerError::EventPublication {
                message: format!("Failed to serialize event {}: {}", envelope.event_id, e),
            })?;

        self.transport.send(topic, key, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::outbound::events::InMemoryTransport,
        domain::{
            models::{AuditInfo, Feature, FeatureEvent, FeatureStatus},
            value_objects::Code,
        },
    };
    use chrono::Utc;

    fn feature() -> Feature {
        Feature {
            id: 1,
            code: Code::new("F1").unwrap(),
            product_id: 1,
            product_code: Code::new("intellij").unwrap(),
            release_id: 1,
            release_code: Code::new("IDEA-2023.3.8").unwrap(),
            title: "Broker Feature".to_string(),
            description: None,
            status: FeatureStatus::New,
            assigned_to: None,
            audit: AuditInfo::created("user", Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_events_are_routed_by_kind() {
        let transport = InMemoryTransport::new();
        let channels = EventChannels {
            new_features: "ft.new".to_string(),
            updated_features: "ft.updated".to_string(),
            deleted_features: "ft.deleted".to_string(),
        };
        let publisher = BrokerEventPublisher::new(Arc::new(transport.clone()), channels);

        let created = EventEnvelope::new(FeatureEvent::Created { feature: feature() }, Utc::now());
        let deleted = EventEnvelope::new(
            FeatureEvent::Deleted {
                feature: feature(),
                deleted_by: "admin".to_string(),
                deleted_at: Utc::now(),
            },
            Utc::now(),
        );

        publisher.publish(&created).await.unwrap();
        publisher.publish(&deleted).await.unwrap();

        let new_messages = transport.messages_for("ft.new");
        assert_eq!(new_messages.len(), 1);
        assert_eq!(new_messages[0].key, "F1");
        assert_eq!(new_messages[0].payload["event"]["type"], "FEATURE_CREATED");
        assert_eq!(
            new_messages[0].payload["eventId"],
            created.event_id.to_string()
        );

        let deleted_messages = transport.messages_for("ft.deleted");
        assert_eq!(deleted_messages.len(), 1);
        assert_eq!(deleted_messages[0].payload["event"]["deletedBy"], "admin");
        assert!(transport.messages_for("ft.updated").is_empty());
    }
}
