use serde::{Deserialize, Serialize};

use crate::domain::{errors::ValidationError, models::AuditInfo, value_objects::Code};

/// Progress state of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureStatus {
    #[default]
    New,
    InProgress,
    OnHold,
    Done,
    Released,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::New => "NEW",
            FeatureStatus::InProgress => "IN_PROGRESS",
            FeatureStatus::OnHold => "ON_HOLD",
            FeatureStatus::Done => "DONE",
            FeatureStatus::Released => "RELEASED",
        }
    }
}

impl std::str::FromStr for FeatureStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(FeatureStatus::New),
            "IN_PROGRESS" => Ok(FeatureStatus::InProgress),
            "ON_HOLD" => Ok(FeatureStatus::OnHold),
            "DONE" => Ok(FeatureStatus::Done),
            "RELEASED" => Ok(FeatureStatus::Released),
            _ => Err(ValidationError::InvalidField {
                field: "status".to_string(),
                value: s.to_string(),
                expected: "NEW, IN_PROGRESS, ON_HOLD, DONE or RELEASED".to_string(),
            }),
        }
    }
}

/// A feature planned for a release.
///
/// `product_id`/`product_code` are always those of the owning release's product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: i64,
    pub code: Code,
    pub product_id: i64,
    pub product_code: Code,
    pub release_id: i64,
    pub release_code: Code,
    pub title: String,
    pub description: Option<String>,
    pub status: FeatureStatus,
    pub assigned_to: Option<String>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

/// A feature that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewFeature {
    pub code: Code,
    pub product_id: i64,
    pub product_code: Code,
    pub release_id: i64,
    pub release_code: Code,
    pub title: String,
    pub description: Option<String>,
    pub status: FeatureStatus,
    pub assigned_to: Option<String>,
    pub audit: AuditInfo,
}

impl NewFeature {
    pub fn with_id(self, id: i64) -> Feature {
        Feature {
            id,
            code: self.code,
            product_id: self.product_id,
            product_code: self.product_code,
            release_id: self.release_id,
            release_code: self.release_code,
            title: self.title,
            description: self.description,
            status: self.status,
            assigned_to: self.assigned_to,
            audit: self.audit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_match_storage_form() {
        for status in [
            FeatureStatus::New,
            FeatureStatus::InProgress,
            FeatureStatus::OnHold,
            FeatureStatus::Done,
            FeatureStatus::Released,
        ] {
            assert_eq!(status.as_str().parse::<FeatureStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }
}
