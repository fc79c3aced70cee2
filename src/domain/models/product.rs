use serde::{Deserialize, Serialize};

use crate::domain::{models::AuditInfo, value_objects::Code};

/// Root of the containment hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub code: Code,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub disabled: bool,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

/// A product that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: Code,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub disabled: bool,
    pub audit: AuditInfo,
}

impl NewProduct {
    pub fn with_id(self, id: i64) -> Product {
        Product {
            id,
            code: self.code,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            disabled: self.disabled,
            audit: self.audit,
        }
    }
}
