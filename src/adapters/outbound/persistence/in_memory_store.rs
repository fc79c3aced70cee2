use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{
            EventEnvelope, Feature, NewFeature, NewProduct, NewRelease, OutboxRecord, Product,
            Release,
        },
    },
    ports::repositories::{
        FeatureRepository, OutboxRepository, ProductRepository, ReleaseRepository, Transaction,
        TransactionManager, TransactionMode,
    },
};

/// In-memory storage backend for testing and development.
///
/// A read-write transaction holds the write lock and works on a copy of the data that
/// replaces the shared state on commit, so concurrent writers are serialized.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
}

#[derive(Clone, Default)]
struct StoreData {
    products: BTreeMap<i64, Product>,
    releases: BTreeMap<i64, Release>,
    features: BTreeMap<i64, Feature>,
    outbox: BTreeMap<i64, OutboxRecord>,
    sequences: Sequences,
}

#[derive(Clone, Copy, Default)]
struct Sequences {
    product: i64,
    release: i64,
    feature: i64,
    outbox: i64,
}

fn next_id(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionManager for InMemoryStore {
    async fn begin(&self, mode: TransactionMode) -> TrackerResult<Box<dyn Transaction>> {
        let state = match mode {
            TransactionMode::ReadOnly => TxState::ReadOnly(self.data.clone().read_owned().await),
            TransactionMode::ReadWrite => {
                let guard = self.data.clone().write_owned().await;
                let working = guard.clone();
                TxState::ReadWrite { guard, working }
            }
        };

        Ok(Box::new(InMemoryTransaction { state }))
    }
}

/// Transaction over [`InMemoryStore`]
pub struct InMemoryTransaction {
    state: TxState,
}

enum TxState {
    ReadOnly(OwnedRwLockReadGuard<StoreData>),
    ReadWrite {
        guard: OwnedRwLockWriteGuard<StoreData>,
        working: StoreData,
    },
    Closed,
}

impl InMemoryTransaction {
    fn data(&self) -> TrackerResult<&StoreData> {
        match &self.state {
            TxState::ReadOnly(guard) => Ok(&**guard),
            TxState::ReadWrite { working, .. } => Ok(working),
            TxState::Closed => Err(TrackerError::TransactionClosed),
        }
    }

    fn data_mut(&mut self) -> TrackerResult<&mut StoreData> {
        match &mut self.state {
            TxState::ReadOnly(_) => Err(TrackerError::ReadOnlyTransaction),
            TxState::ReadWrite { working, .. } => Ok(working),
            TxState::Closed => Err(TrackerError::TransactionClosed),
        }
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    fn products(&mut self) -> &mut dyn ProductRepository {
        self
    }

    fn releases(&mut self) -> &mut dyn ReleaseRepository {
        self
    }

    fn features(&mut self) -> &mut dyn FeatureRepository {
        self
    }

    fn outbox(&mut self) -> &mut dyn OutboxRepository {
        self
    }

    async fn commit(&mut self) -> TrackerResult<()> {
        match std::mem::replace(&mut self.state, TxState::Closed) {
            TxState::ReadOnly(_) => Ok(()),
            TxState::ReadWrite { mut guard, working } => {
                *guard = working;
                Ok(())
            }
            TxState::Closed => Err(TrackerError::TransactionClosed),
        }
    }

    async fn rollback(&mut self) -> TrackerResult<()> {
        match std::mem::replace(&mut self.state, TxState::Closed) {
            TxState::Closed => Err(TrackerError::TransactionClosed),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryTransaction {
    async fn find_all(&mut self) -> TrackerResult<Vec<Product>> {
        Ok(self.data()?.products.values().cloned().collect())
    }

    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Product>> {
        let data = self.data()?;
        Ok(data.products.values().find(|p| p.code == *code).cloned())
    }

    async fn insert(&mut self, product: NewProduct) -> TrackerResult<Product> {
        let data = self.data_mut()?;

        if data.products.values().any(|p| p.code == product.code) {
            return Err(TrackerError::Conflict {
                entity: "Product",
                code: product.code.to_string(),
            });
        }

        let product = product.with_id(next_id(&mut data.sequences.product));
        data.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&mut self, product: &Product) -> TrackerResult<()> {
        let data = self.data_mut()?;
        let existing = data.products.get_mut(&product.id).ok_or_else(|| {
            TrackerError::ProductNotFound {
                code: product.code.to_string(),
            }
        })?;
        *existing = product.clone();
        Ok(())
    }
}

#[async_trait]
impl ReleaseRepository for InMemoryTransaction {
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Release>> {
        let data = self.data()?;
        Ok(data.releases.values().find(|r| r.code == *code).cloned())
    }

    async fn find_by_product_code(&mut self, product_code: &str) -> TrackerResult<Vec<Release>> {
        let data = self.data()?;
        Ok(data
            .releases
            .values()
            .filter(|r| r.product_code == *product_code)
            .cloned()
            .collect())
    }

    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool> {
        let data = self.data()?;
        Ok(data.releases.values().any(|r| r.code == *code))
    }

    async fn insert(&mut self, release: NewRelease) -> TrackerResult<Release> {
        let data = self.data_mut()?;

        if !data.products.contains_key(&release.product_id) {
            return Err(TrackerError::infrastructure(format!(
                "Foreign key violation: product {} does not exist",
                release.product_id
            )));
        }

        if data.releases.values().any(|r| r.code == release.code) {
            return Err(TrackerError::Conflict {
                entity: "Release",
                code: release.code.to_string(),
            });
        }

        let release = release.with_id(next_id(&mut data.sequences.release));
        data.releases.insert(release.id, release.clone());
        Ok(release)
    }

    async fn update(&mut self, release: &Release) -> TrackerResult<()> {
        let data = self.data_mut()?;
        let existing = data.releases.get_mut(&release.id).ok_or_else(|| {
            TrackerError::ReleaseNotFound {
                code: release.code.to_string(),
            }
        })?;
        *existing = release.clone();
        Ok(())
    }

    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()> {
        let data = self.data_mut()?;

        let Some(id) = data
            .releases
            .values()
            .find(|r| r.code == *code)
            .map(|r| r.id)
        else {
            return Ok(());
        };

        if data.features.values().any(|f| f.release_id == id) {
            return Err(TrackerError::infrastructure(format!(
                "Foreign key violation: release '{}' is still referenced by features",
                code
            )));
        }

        data.releases.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FeatureRepository for InMemoryTransaction {
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Feature>> {
        let data = self.data()?;
        Ok(data.features.values().find(|f| f.code == *code).cloned())
    }

    async fn find_by_release_code(&mut self, release_code: &str) -> TrackerResult<Vec<Feature>> {
        let data = self.data()?;
        Ok(data
            .features
            .values()
            .filter(|f| f.release_code == *release_code)
            .cloned()
            .collect())
    }

    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool> {
        let data = self.data()?;
        Ok(data.features.values().any(|f| f.code == *code))
    }

    async fn insert(&mut self, feature: NewFeature) -> TrackerResult<Feature> {
        let data = self.data_mut()?;

        if !data.releases.contains_key(&feature.release_id) {
            return Err(TrackerError::infrastructure(format!(
                "Foreign key violation: release {} does not exist",
                feature.release_id
            )));
        }

        if data.features.values().any(|f| f.code == feature.code) {
            return Err(TrackerError::Conflict {
                entity: "Feature",
                code: feature.code.to_string(),
            });
        }

        let feature = feature.with_id(next_id(&mut data.sequences.feature));
        data.features.insert(feature.id, feature.clone());
        Ok(feature)
    }

    async fn update(&mut self, feature: &Feature) -> TrackerResult<()> {
        let data = self.data_mut()?;
        let existing = data.features.get_mut(&feature.id).ok_or_else(|| {
            TrackerError::FeatureNotFound {
                code: feature.code.to_string(),
            }
        })?;
        *existing = feature.clone();
        Ok(())
    }

    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()> {
        let data = self.data_mut()?;
        data.features.retain(|_, f| f.code != *code);
        Ok(())
    }

    async fn delete_by_release_code(&mut self, release_code: &str) -> TrackerResult<u64> {
        let data = self.data_mut()?;
        let before = data.features.len();
        data.features.retain(|_, f| f.release_code != *release_code);
        Ok((before - data.features.len()) as u64)
    }
}

#[async_trait]
impl OutboxRepository for InMemoryTransaction {
    async fn append(&mut self, envelope: &EventEnvelope) -> TrackerResult<OutboxRecord> {
        let data = self.data_mut()?;
        let record = OutboxRecord {
            id: next_id(&mut data.sequences.outbox),
            envelope: envelope.clone(),
            created_at: envelope.occurred_at,
            dispatched_at: None,
        };
        data.outbox.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_pending(&mut self, limit: usize) -> TrackerResult<Vec<OutboxRecord>> {
        let data = self.data()?;
        Ok(data.outbox.values().take(limit).cloned().collect())
    }

    // Only pending records are kept; a delivered one is dropped right away
    async fn mark_dispatched(&mut self, id: i64, _at: DateTime<Utc>) -> TrackerResult<()> {
        let data = self.data_mut()?;
        data.outbox.remove(&id);
        Ok(())
    }

    async fn purge_dispatched(&mut self, _before: DateTime<Utc>) -> TrackerResult<u64> {
        self.data_mut()?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        models::{AuditInfo, FeatureStatus, ReleaseStatus},
        value_objects::Code,
    };

    fn new_product(code: &str) -> NewProduct {
        NewProduct {
            code: Code::new(code).unwrap(),
            name: "IntelliJ IDEA".to_string(),
            description: None,
            image_url: None,
            disabled: false,
            audit: AuditInfo::created("admin", Utc::now()),
        }
    }

    fn new_release(product: &Product, code: &str) -> NewRelease {
        NewRelease {
            code: Code::new(code).unwrap(),
            product_id: product.id,
            product_code: product.code.clone(),
            description: None,
            status: ReleaseStatus::Draft,
            audit: AuditInfo::created("admin", Utc::now()),
        }
    }

    fn new_feature(release: &Release, code: &str) -> NewFeature {
        NewFeature {
            code: Code::new(code).unwrap(),
            product_id: release.product_id,
            product_code: release.product_code.clone(),
            release_id: release.id,
            release_code: release.code.clone(),
            title: "Feature".to_string(),
            description: None,
            status: FeatureStatus::New,
            assigned_to: None,
            audit: AuditInfo::created("admin", Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = InMemoryStore::new();

        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();
        let product = tx.products().insert(new_product("intellij")).await.unwrap();
        assert_eq!(product.id, 1);
        tx.commit().await.unwrap();

        let mut tx = store.begin(TransactionMode::ReadOnly).await.unwrap();
        let found = tx.products().find_by_code("intellij").await.unwrap();
        assert_eq!(found, Some(product));
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let store = InMemoryStore::new();

        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();
        tx.products().insert(new_product("intellij")).await.unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();
            tx.products().insert(new_product("goland")).await.unwrap();
        }

        let mut tx = store.begin(TransactionMode::ReadOnly).await.unwrap();
        assert!(tx.products().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_transaction_rejects_writes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(TransactionMode::ReadOnly).await.unwrap();

        let result = tx.products().insert(new_product("intellij")).await;
        assert!(matches!(result, Err(TrackerError::ReadOnlyTransaction)));
    }

    #[tokio::test]
    async fn test_unique_code_constraint() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();

        tx.products().insert(new_product("intellij")).await.unwrap();
        let result = tx.products().insert(new_product("intellij")).await;
        assert!(matches!(
            result,
            Err(TrackerError::Conflict {
                entity: "Product",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_release_with_features_cannot_be_deleted_first() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();

        let product = tx.products().insert(new_product("intellij")).await.unwrap();
        let release = tx
            .releases()
            .insert(new_release(&product, "IDEA-2024.1"))
            .await
            .unwrap();
        tx.features()
            .insert(new_feature(&release, "F1"))
            .await
            .unwrap();

        assert!(tx.releases().delete_by_code("IDEA-2024.1").await.is_err());

        let removed = tx
            .features()
            .delete_by_release_code("IDEA-2024.1")
            .await
            .unwrap();
        assert_eq!(removed, 1);
        tx.releases().delete_by_code("IDEA-2024.1").await.unwrap();
        assert!(!tx.releases().exists_by_code("IDEA-2024.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_outbox_keeps_only_pending_records() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();

        let product = tx.products().insert(new_product("intellij")).await.unwrap();
        let release = tx
            .releases()
            .insert(new_release(&product, "IDEA-2024.1"))
            .await
            .unwrap();
        let feature = tx
            .features()
            .insert(new_feature(&release, "F1"))
            .await
            .unwrap();

        let envelope = EventEnvelope::new(
            crate::domain::models::FeatureEvent::Created { feature },
            Utc::now(),
        );
        let first = tx.outbox().append(&envelope).await.unwrap();
        let second = tx.outbox().append(&envelope).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();
        tx.outbox().mark_dispatched(first.id, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(TransactionMode::ReadOnly).await.unwrap();
        let pending = tx.outbox().find_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        drop(tx);

        assert_eq!(store.data.read().await.outbox.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_transaction_is_rejected() {
        let store = InMemoryStore::new();
        let mut tx = store.begin(TransactionMode::ReadWrite).await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(
            tx.products().find_all().await,
            Err(TrackerError::TransactionClosed)
        ));
        assert!(matches!(
            tx.commit().await,
            Err(TrackerError::TransactionClosed)
        ));
    }
}
