use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{
    domain::errors::{TrackerError, TrackerResult},
    ports::events::BrokerTransport,
};

/// A message accepted by [`InMemoryTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: String,
    pub payload: serde_json::Value,
}

/// Broker transport that keeps messages in memory, for tests and local development
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    messages: Arc<Mutex<Vec<BrokerMessage>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn messages(&self) -> Vec<BrokerMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Messages sent to one topic
    pub fn messages_for(&self, topic: &str) -> Vec<BrokerMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }
}

#[async_trait]
impl BrokerTransport for InMemoryTransport {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &serde_json::Value,
    ) -> TrackerResult<()> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| TrackerError::EventPublication {
                message: "in-memory transport lock poisoned".to_string(),
            })?;

        messages.push(BrokerMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
