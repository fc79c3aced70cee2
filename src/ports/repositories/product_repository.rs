use async_trait::async_trait;

use crate::domain::{
    errors::TrackerResult,
    models::{NewProduct, Product},
};

/// Repository for products, always used through a [`Transaction`](super::Transaction)
#[async_trait]
pub trait ProductRepository: Send {
    /// List every product
    async fn find_all(&mut self) -> TrackerResult<Vec<Product>>;

    /// Find a product by its business code
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Product>>;

    /// Insert a new product; a duplicate code fails with `Conflict`
    async fn insert(&mut self, product: NewProduct) -> TrackerResult<Product>;

    /// Overwrite the mutable fields and audit info of an existing product
    async fn update(&mut self, product: &Product) -> TrackerResult<()>;
}
