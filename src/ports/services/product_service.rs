use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{CreateProductCommand, Product, UpdateProductCommand},
};

/// Service port for product management
#[async_trait]
pub trait ProductService: Send + Sync + 'static {
    /// List all products
    async fn find_all_products(&self) -> TrackerResult<Vec<Product>>;

    /// Find a product by code; absence is not an error
    async fn find_product_by_code(&self, code: &str) -> TrackerResult<Option<Product>>;

    /// Create a product and return its identity
    async fn create_product(&self, cmd: CreateProductCommand) -> TrackerResult<i64>;

    /// Update an existing product
    async fn update_product(&self, cmd: UpdateProductCommand) -> TrackerResult<()>;
}
