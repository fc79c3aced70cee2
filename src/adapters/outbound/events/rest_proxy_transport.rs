use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::{
    domain::errors::{TrackerError, TrackerResult},
    ports::events::BrokerTransport,
};

const KAFKA_JSON_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

/// Produces messages through a Kafka REST Proxy (v2 API)
#[derive(Debug, Clone)]
pub struct RestProxyTransport {
    client: Client,
    base_url: String,
}

impl RestProxyTransport {
    pub fn new(base_url: &str) -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TrackerError::EventPublication {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{}", self.base_url, topic)
    }
}

/// Request body for producing a single keyed record
fn produce_body(key: &str, payload: &serde_json::Value) -> serde_json::Value {
    json!({
        "records": [
            { "key": key, "value": payload }
        ]
    })
}

#[async_trait]
impl BrokerTransport for RestProxyTransport {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &serde_json::Value,
    ) -> TrackerResult<()> {
        let response = self
            .client
            .post(self.topic_url(topic))
            .header(reqwest::header::CONTENT_TYPE, KAFKA_JSON_CONTENT_TYPE)
            .body(produce_body(key, payload).to_string())
            .send()
            .await
            .map_err(|e| TrackerError::EventPublication {
                message: format!("Failed to reach broker for topic '{}': {}", topic, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::EventPublication {
                message: format!(
                    "Broker rejected message for topic '{}' with status {}: {}",
                    topic, status, body
                ),
            });
        }

        Ok(())
    }
}
