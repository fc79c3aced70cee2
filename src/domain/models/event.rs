use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::Feature;

/// Lifecycle notification about a feature, carrying its snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum FeatureEvent {
    #[serde(rename = "FEATURE_CREATED")]
    Created { feature: Feature },

    #[serde(rename = "FEATURE_UPDATED")]
    Updated { feature: Feature },

    /// Carries the snapshot taken before the delete
    #[serde(rename = "FEATURE_DELETED")]
    Deleted {
        feature: Feature,
        deleted_by: String,
        deleted_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureEventKind {
    Created,
    Updated,
    Deleted,
}

impl FeatureEvent {
    pub fn kind(&self) -> FeatureEventKind {
        match self {
            FeatureEvent::Created { .. } => FeatureEventKind::Created,
            FeatureEvent::Updated { .. } => FeatureEventKind::Updated,
            FeatureEvent::Deleted { .. } => FeatureEventKind::Deleted,
        }
    }

    pub fn feature(&self) -> &Feature {
        match self {
            FeatureEvent::Created { feature }
            | FeatureEvent::Updated { feature }
            | FeatureEvent::Deleted { feature, .. } => feature,
        }
    }
}

/// An event plus the identity consumers use to de-duplicate redeliveries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: FeatureEvent,
}

impl EventEnvelope {
    pub fn new(event: FeatureEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            event,
        }
    }
}

/// An event recorded in the same transaction as the write that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub id: i64,
    pub envelope: EventEnvelope,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        models::{AuditInfo, FeatureStatus},
        value_objects::Code,
    };

    fn sample_feature() -> Feature {
        Feature {
            id: 7,
            code: Code::new("IJ-10001").unwrap(),
            product_id: 1,
            product_code: Code::new("intellij").unwrap(),
            release_id: 3,
            release_code: Code::new("IDEA-2023.3.8").unwrap(),
            title: "Event Test Feature".to_string(),
            description: None,
            status: FeatureStatus::New,
            assigned_to: Some("john.doe".to_string()),
            audit: AuditInfo::created("user", Utc::now()),
        }
    }

    #[test]
    fn test_deleted_event_wire_format() {
        let deleted_at = Utc::now();
        let event = FeatureEvent::Deleted {
            feature: sample_feature(),
            deleted_by: "admin".to_string(),
            deleted_at,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "FEATURE_DELETED");
        assert_eq!(value["deletedBy"], "admin");
        assert_eq!(value["feature"]["code"], "IJ-10001");
        assert_eq!(value["feature"]["releaseCode"], "IDEA-2023.3.8");
        assert_eq!(value["feature"]["createdBy"], "user");

        let decoded: FeatureEvent = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.kind(), FeatureEventKind::Deleted);
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let first = EventEnvelope::new(
            FeatureEvent::Created {
                feature: sample_feature(),
            },
            Utc::now(),
        );
        let second = EventEnvelope::new(first.event.clone(), Utc::now());
        assert_ne!(first.event_id, second.event_id);
        assert_eq!(first.event.feature().title, "Event Test Feature");
    }
}
