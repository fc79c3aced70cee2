use async_trait::async_trait;

use super::{BrokerEventPublisher, LoggingEventPublisher};
use crate::{
    domain::{errors::TrackerResult, models::EventEnvelope},
    ports::events::EventPublisher,
};

/// The publisher selected at startup from `ft.events.publisher`
#[derive(Clone)]
pub enum ConfiguredPublisher {
    NoOp(LoggingEventPublisher),
    Broker(BrokerEventPublisher),
}

impl ConfiguredPublisher {
    pub fn mode_name(&self) -> &'static str {
        match self {
            ConfiguredPublisher::NoOp(_) => "DUMB",
            ConfiguredPublisher::Broker(_) => "BROKER",
        }
    }
}

#[async_trait]
impl EventPublisher for ConfiguredPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> TrackerResult<()> {
        match self {
            ConfiguredPublisher::NoOp(publisher) => publisher.publish(envelope).await,
            ConfiguredPublisher::Broker(publisher) => publisher.publish(envelope).await,
        }
    }
}
