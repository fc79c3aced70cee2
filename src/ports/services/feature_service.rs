use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{CreateFeatureCommand, DeleteFeatureCommand, Feature, UpdateFeatureCommand},
};

/// Service port for feature management.
///
/// Every write records a feature event that is delivered after the write commits.
#[async_trait]
pub trait FeatureService: Send + Sync + 'static {
    /// Find a feature by code; absence is not an error
    async fn find_feature_by_code(&self, code: &str) -> TrackerResult<Option<Feature>>;

    /// List features of a release in a dedicated read-only transaction
    async fn find_features(&self, release_code: &str) -> TrackerResult<Vec<Feature>>;

    /// Check if a feature exists
    async fn is_feature_exists(&self, code: &str) -> TrackerResult<bool>;

    /// Create a feature in a release and return its identity
    async fn create_feature(&self, cmd: CreateFeatureCommand) -> TrackerResult<i64>;

    /// Update an existing feature
    async fn update_feature(&self, cmd: UpdateFeatureCommand) -> TrackerResult<()>;

    /// Delete an existing feature
    async fn delete_feature(&self, cmd: DeleteFeatureCommand) -> TrackerResult<()>;
}
