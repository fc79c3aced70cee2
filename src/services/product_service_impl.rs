use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{AuditInfo, CreateProductCommand, NewProduct, Product, UpdateProductCommand},
    },
    ports::{
        repositories::{complete, Transaction, TransactionManager, TransactionMode},
        services::ProductService,
    },
};

/// Implementation of ProductService on top of a transactional store
#[derive(Clone)]
pub struct ProductServiceImpl {
    transactions: Arc<dyn TransactionManager>,
}

impl ProductServiceImpl {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    async fn apply_update(
        tx: &mut dyn Transaction,
        cmd: UpdateProductCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<()> {
        let mut product = tx
            .products()
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| TrackerError::ProductNotFound {
                code: cmd.code.clone(),
            })?;

        product.name = cmd.name;
        product.description = cmd.description;
        product.image_url = cmd.image_url;
        product.audit.touch(cmd.updated_by, now);

        tx.products().update(&product).await
    }
}

#[async_trait]
impl ProductService for ProductServiceImpl {
    async fn find_all_products(&self) -> TrackerResult<Vec<Product>> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.products().find_all().await;
        complete(tx, result).await
    }

    async fn find_product_by_code(&self, code: &str) -> TrackerResult<Option<Product>> {
        debug!(code, "Looking up product");
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.products().find_by_code(code).await;
        complete(tx, result).await
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, created_by = %cmd.created_by))]
    async fn create_product(&self, cmd: CreateProductCommand) -> TrackerResult<i64> {
        let product = NewProduct {
            code: cmd.code,
            name: cmd.name,
            description: cmd.description,
            image_url: cmd.image_url,
            disabled: false,
            audit: AuditInfo::created(cmd.created_by, Utc::now()),
        };

        // Duplicate codes are rejected by the store
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = tx.products().insert(product).await;
        let product = complete(tx, result).await?;

        info!(product_id = product.id, "Product created");
        Ok(product.id)
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, updated_by = %cmd.updated_by))]
    async fn update_product(&self, cmd: UpdateProductCommand) -> TrackerResult<()> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::apply_update(tx.as_mut(), cmd, Utc::now()).await;
        complete(tx, result).await?;

        info!("Product updated");
        Ok(())
    }
}
