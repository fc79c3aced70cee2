use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created and last updated an entity, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInfo {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuditInfo {
    pub fn created(by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            created_by: by.into(),
            created_at: at,
            updated_by: None,
            updated_at: None,
        }
    }

    /// Record an update by the given principal
    pub fn touch(&mut self, by: impl Into<String>, at: DateTime<Utc>) {
        self.updated_by = Some(by.into());
        self.updated_at = Some(at);
    }
}
