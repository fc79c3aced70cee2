use async_trait::async_trait;
use tracing::warn;

use super::{FeatureRepository, OutboxRepository, ProductRepository, ReleaseRepository};
use crate::domain::errors::TrackerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// A unit of work spanning every repository.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    fn products(&mut self) -> &mut dyn ProductRepository;

    fn releases(&mut self) -> &mut dyn ReleaseRepository;

    fn features(&mut self) -> &mut dyn FeatureRepository;

    fn outbox(&mut self) -> &mut dyn OutboxRepository;

    /// Make all writes of this transaction durable
    async fn commit(&mut self) -> TrackerResult<()>;

    /// Discard all writes of this transaction
    async fn rollback(&mut self) -> TrackerResult<()>;
}

/// Opens transactions against a storage backend
#[async_trait]
pub trait TransactionManager: Send + Sync + 'static {
    async fn begin(&self, mode: TransactionMode) -> TrackerResult<Box<dyn Transaction>>;
}

/// Commit on success, roll back on failure, and hand back the operation's result
pub async fn complete<T: Send>(
    mut tx: Box<dyn Transaction>,
    result: TrackerResult<T>,
) -> TrackerResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
