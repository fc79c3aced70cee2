use async_trait::async_trait;

use crate::domain::{errors::TrackerResult, models::EventEnvelope};

/// Delivers feature events to downstream consumers
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish(&self, envelope: &EventEnvelope) -> TrackerResult<()>;
}

/// Low-level pub/sub transport used by the broker publisher
#[async_trait]
pub trait BrokerTransport: Send + Sync + 'static {
    /// Send one keyed JSON message to a topic
    async fn send(&self, topic: &str, key: &str, payload: &serde_json::Value)
    -> TrackerResult<()>;
}
