use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{
            AuditInfo, CreateReleaseCommand, NewRelease, Release, ReleaseStatus,
            UpdateReleaseCommand,
        },
    },
    ports::{
        repositories::{complete, Transaction, TransactionManager, TransactionMode},
        services::ReleaseService,
    },
};

/// Implementation of ReleaseService on top of a transactional store
#[derive(Clone)]
pub struct ReleaseServiceImpl {
    transactions: Arc<dyn TransactionManager>,
}

impl ReleaseServiceImpl {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    async fn insert_release(
        tx: &mut dyn Transaction,
        cmd: CreateReleaseCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<Release> {
        let product = tx
            .products()
            .find_by_code(&cmd.product_code)
            .await?
            .ok_or_else(|| TrackerError::ProductNotFound {
                code: cmd.product_code.clone(),
            })?;

        let release = NewRelease {
            code: cmd.code,
            product_id: product.id,
            product_code: product.code,
            description: cmd.description,
            status: ReleaseStatus::Draft,
            audit: AuditInfo::created(cmd.created_by, now),
        };

        tx.releases().insert(release).await
    }

    async fn apply_update(
        tx: &mut dyn Transaction,
        cmd: UpdateReleaseCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<()> {
        let mut release = tx
            .releases()
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| TrackerError::ReleaseNotFound {
                code: cmd.code.clone(),
            })?;

        release.description = cmd.description;
        if let Some(status) = cmd.status {
            release.status = status;
        }
        release.released_at = cmd.released_at;
        release.audit.touch(cmd.updated_by, now);

        tx.releases().update(&release).await
    }

    async fn remove_release(tx: &mut dyn Transaction, code: &str) -> TrackerResult<u64> {
        if !tx.releases().exists_by_code(code).await? {
            return Err(TrackerError::ReleaseNotFound {
                code: code.to_string(),
            });
        }

        // Features first, the release cannot be removed while they reference it
        let removed = tx.features().delete_by_release_code(code).await?;
        tx.releases().delete_by_code(code).await?;
        Ok(removed)
    }
}

#[async_trait]
impl ReleaseService for ReleaseServiceImpl {
    async fn find_releases_by_product_code(
        &self,
        product_code: &str,
    ) -> TrackerResult<Vec<Release>> {
        debug!(product_code, "Listing releases");
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.releases().find_by_product_code(product_code).await;
        complete(tx, result).await
    }

    async fn find_release_by_code(&self, code: &str) -> TrackerResult<Option<Release>> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.releases().find_by_code(code).await;
        complete(tx, result).await
    }

    async fn is_release_exists(&self, code: &str) -> TrackerResult<bool> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.releases().exists_by_code(code).await;
        complete(tx, result).await
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, product = %cmd.product_code))]
    async fn create_release(&self, cmd: CreateReleaseCommand) -> TrackerResult<i64> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::insert_release(tx.as_mut(), cmd, Utc::now()).await;
        let release = complete(tx, result).await?;

        info!(release_id = release.id, "Release created");
        Ok(release.id)
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, updated_by = %cmd.updated_by))]
    async fn update_release(&self, cmd: UpdateReleaseCommand) -> TrackerResult<()> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::apply_update(tx.as_mut(), cmd, Utc::now()).await;
        complete(tx, result).await?;

        info!("Release updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_release(&self, code: &str) -> TrackerResult<()> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::remove_release(tx.as_mut(), code).await;
        let removed_features = complete(tx, result).await?;

        info!(removed_features, "Release deleted");
        Ok(())
    }
}
