use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{CreateReleaseCommand, Release, UpdateReleaseCommand},
};

/// Service port for release management
#[async_trait]
pub trait ReleaseService: Send + Sync + 'static {
    /// List releases of a product
    async fn find_releases_by_product_code(&self, product_code: &str)
    -> TrackerResult<Vec<Release>>;

    /// Find a release by code; absence is not an error
    async fn find_release_by_code(&self, code: &str) -> TrackerResult<Option<Release>>;

    /// Check if a release exists
    async fn is_release_exists(&self, code: &str) -> TrackerResult<bool>;

    /// Create a draft release under an existing product
    async fn create_release(&self, cmd: CreateReleaseCommand) -> TrackerResult<i64>;

    /// Update description, status and release date
    async fn update_release(&self, cmd: UpdateReleaseCommand) -> TrackerResult<()>;

    /// Delete a release together with all of its features
    async fn delete_release(&self, code: &str) -> TrackerResult<()>;
}
