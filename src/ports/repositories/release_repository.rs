use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{NewRelease, Release},
};

/// Repository for releases
#[async_trait]
pub trait ReleaseRepository: Send {
    /// Find a release by its business code
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Release>>;

    /// List all releases of a product
    async fn find_by_product_code(&mut self, product_code: &str) -> TrackerResult<Vec<Release>>;

    /// Check if a release exists
    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool>;

    /// Insert a new release; the referenced product must exist
    async fn insert(&mut self, release: NewRelease) -> TrackerResult<Release>;

    /// Overwrite description, status, release date and audit info
    async fn update(&mut self, release: &Release) -> TrackerResult<()>;

    /// Delete a release; fails while features still reference it
    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()>;
}
