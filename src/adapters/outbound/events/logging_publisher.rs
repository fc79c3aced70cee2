use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::{errors::TrackerResult, models::EventEnvelope},
    ports::events::EventPublisher,
};

/// Publisher for the `DUMB` mode: events are only logged
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> TrackerResult<()> {
        let feature = envelope.event.feature();
        info!(
            event_id = %envelope.event_id,
            kind = ?envelope.event.kind(),
            feature = %feature.code,
            release = %feature.release_code,
            "Feature event published"
        );
        Ok(())
    }
}
