use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{Feature, NewFeature},
};

/// Repository for features
#[async_trait]
pub trait FeatureRepository: Send {
    /// Find a feature by its business code
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Feature>>;

    /// List all features of a release
    async fn find_by_release_code(&mut self, release_code: &str) -> TrackerResult<Vec<Feature>>;

    /// Check if a feature exists
    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool>;

    /// Insert a new feature; the referenced release must exist
    async fn insert(&mut self, feature: NewFeature) -> TrackerResult<Feature>;

    /// Overwrite title, description, status, assignee and audit info
    async fn update(&mut self, feature: &Feature) -> TrackerResult<()>;

    /// Delete a feature (hard delete)
    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()>;

    /// Delete every feature of a release, returning how many were removed
    async fn delete_by_release_code(&mut self, release_code: &str) -> TrackerResult<u64>;
}
