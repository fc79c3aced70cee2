use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{errors::ValidationError, models::AuditInfo, value_objects::Code};

/// Publication state of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    #[default]
    Draft,
    Released,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Draft => "DRAFT",
            ReleaseStatus::Released => "RELEASED",
        }
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ReleaseStatus::Draft),
            "RELEASED" => Ok(ReleaseStatus::Released),
            _ => Err(ValidationError::InvalidField {
                field: "status".to_string(),
                value: s.to_string(),
                expected: "DRAFT or RELEASED".to_string(),
            }),
        }
    }
}

/// A release of a product; always references an existing product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i64,
    pub code: Code,
    pub product_id: i64,
    pub product_code: Code,
    pub description: Option<String>,
    pub status: ReleaseStatus,
    pub released_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

/// A release that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewRelease {
    pub code: Code,
    pub product_id: i64,
    pub product_code: Code,
    pub description: Option<String>,
    pub status: ReleaseStatus,
    pub audit: AuditInfo,
}

impl NewRelease {
    pub fn with_id(self, id: i64) -> Release {
        Release {
            id,
            code: self.code,
            product_id: self.product_id,
            product_code: self.product_code,
            description: self.description,
            status: self.status,
            released_at: None,
            audit: self.audit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("DRAFT".parse::<ReleaseStatus>(), Ok(ReleaseStatus::Draft));
        assert_eq!(
            "RELEASED".parse::<ReleaseStatus>(),
            Ok(ReleaseStatus::Released)
        );
        assert!("draft".parse::<ReleaseStatus>().is_err());
        assert_eq!(ReleaseStatus::default(), ReleaseStatus::Draft);
    }

    #[test]
    fn test_status_json_representation() {
        assert_eq!(
            serde_json::to_string(&ReleaseStatus::Released).unwrap(),
            "\"RELEASED\""
        );
    }
}
