//! Inputs for mutating service operations.
//!
//! Commands are built at the boundary and always carry the acting principal.

use bon::Builder;
use chrono::{DateTime, Utc};

use crate::domain::{
    models::{FeatureStatus, ReleaseStatus},
    value_objects::Code,
};

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct CreateProductCommand {
    pub code: Code,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct UpdateProductCommand {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct CreateReleaseCommand {
    pub product_code: String,
    pub code: Code,
    pub description: Option<String>,
    pub created_by: String,
}

/// `status: None` keeps the current status; `description` and `released_at` are overwritten as given
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct UpdateReleaseCommand {
    pub code: String,
    pub description: Option<String>,
    pub status: Option<ReleaseStatus>,
    pub released_at: Option<DateTime<Utc>>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct CreateFeatureCommand {
    pub product_code: String,
    pub release_code: String,
    pub code: Code,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub created_by: String,
}

/// `status: None` keeps the current status
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct UpdateFeatureCommand {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<FeatureStatus>,
    pub assigned_to: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct DeleteFeatureCommand {
    pub code: String,
    pub deleted_by: String,
}
