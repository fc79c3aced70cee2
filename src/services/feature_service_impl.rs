use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{
            AuditInfo, CreateFeatureCommand, DeleteFeatureCommand, EventEnvelope, Feature,
            FeatureEvent, FeatureStatus, NewFeature, UpdateFeatureCommand,
        },
    },
    ports::{
        repositories::{complete, Transaction, TransactionManager, TransactionMode},
        services::FeatureService,
    },
    services::EventDispatcher,
};

/// Implementation of FeatureService.
///
/// Each write appends its event to the outbox in the same transaction and asks the
/// dispatcher to deliver it once the transaction has committed.
#[derive(Clone)]
pub struct FeatureServiceImpl {
    transactions: Arc<dyn TransactionManager>,
    dispatcher: Arc<EventDispatcher>,
}

impl FeatureServiceImpl {
    pub fn new(transactions: Arc<dyn TransactionManager>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            transactions,
            dispatcher,
        }
    }

    async fn insert_feature(
        tx: &mut dyn Transaction,
        cmd: CreateFeatureCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<Feature> {
        let release = tx
            .releases()
            .find_by_code(&cmd.release_code)
            .await?
            .ok_or_else(|| TrackerError::ReleaseNotFound {
                code: cmd.release_code.clone(),
            })?;

        // The owning product comes from the release, not from the command
        let product = tx
            .products()
            .find_by_code(release.product_code.as_str())
            .await?
            .ok_or_else(|| TrackerError::ProductNotFound {
                code: release.product_code.to_string(),
            })?;

        if product.code.as_str() != cmd.product_code {
            debug!(
                requested = %cmd.product_code,
                actual = %product.code,
                "Feature product taken from its release"
            );
        }

        let feature = tx
            .features()
            .insert(NewFeature {
                code: cmd.code,
                product_id: product.id,
                product_code: product.code,
                release_id: release.id,
                release_code: release.code,
                title: cmd.title,
                description: cmd.description,
                status: FeatureStatus::New,
                assigned_to: cmd.assigned_to,
                audit: AuditInfo::created(cmd.created_by, now),
            })
            .await?;

        let event = FeatureEvent::Created {
            feature: feature.clone(),
        };
        tx.outbox().append(&EventEnvelope::new(event, now)).await?;
        Ok(feature)
    }

    async fn apply_update(
        tx: &mut dyn Transaction,
        cmd: UpdateFeatureCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<Feature> {
        let mut feature = tx
            .features()
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| TrackerError::FeatureNotFound {
                code: cmd.code.clone(),
            })?;

        feature.title = cmd.title;
        feature.description = cmd.description;
        if let Some(status) = cmd.status {
            feature.status = status;
        }
        feature.assigned_to = cmd.assigned_to;
        feature.audit.touch(cmd.updated_by, now);

        tx.features().update(&feature).await?;

        let event = FeatureEvent::Updated {
            feature: feature.clone(),
        };
        tx.outbox().append(&EventEnvelope::new(event, now)).await?;
        Ok(feature)
    }

    async fn remove_feature(
        tx: &mut dyn Transaction,
        cmd: DeleteFeatureCommand,
        now: DateTime<Utc>,
    ) -> TrackerResult<Feature> {
        let feature = tx
            .features()
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| TrackerError::FeatureNotFound {
                code: cmd.code.clone(),
            })?;

        tx.features().delete_by_code(&cmd.code).await?;

        let event = FeatureEvent::Deleted {
            feature: feature.clone(),
            deleted_by: cmd.deleted_by,
            deleted_at: now,
        };
        tx.outbox().append(&EventEnvelope::new(event, now)).await?;
        Ok(feature)
    }
}

#[async_trait]
impl FeatureService for FeatureServiceImpl {
    async fn find_feature_by_code(&self, code: &str) -> TrackerResult<Option<Feature>> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.features().find_by_code(code).await;
        complete(tx, result).await
    }

    async fn find_features(&self, release_code: &str) -> TrackerResult<Vec<Feature>> {
        debug!(release_code, "Listing features");
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.features().find_by_release_code(release_code).await;
        complete(tx, result).await
    }

    async fn is_feature_exists(&self, code: &str) -> TrackerResult<bool> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.features().exists_by_code(code).await;
        complete(tx, result).await
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, release = %cmd.release_code))]
    async fn create_feature(&self, cmd: CreateFeatureCommand) -> TrackerResult<i64> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::insert_feature(tx.as_mut(), cmd, Utc::now()).await;
        let feature = complete(tx, result).await?;

        info!(feature_id = feature.id, "Feature created");
        self.dispatcher.request_dispatch();
        Ok(feature.id)
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, updated_by = %cmd.updated_by))]
    async fn update_feature(&self, cmd: UpdateFeatureCommand) -> TrackerResult<()> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::apply_update(tx.as_mut(), cmd, Utc::now()).await;
        let feature = complete(tx, result).await?;

        info!(status = feature.status.as_str(), "Feature updated");
        self.dispatcher.request_dispatch();
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(code = %cmd.code, deleted_by = %cmd.deleted_by))]
    async fn delete_feature(&self, cmd: DeleteFeatureCommand) -> TrackerResult<()> {
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = Self::remove_feature(tx.as_mut(), cmd, Utc::now()).await;
        let feature = complete(tx, result).await?;

        info!(release = %feature.release_code, "Feature deleted");
        self.dispatcher.request_dispatch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::outbound::{events::LoggingEventPublisher, persistence::InMemoryStore},
        domain::{
            models::{CreateProductCommand, CreateReleaseCommand, FeatureEventKind, OutboxRecord},
            value_objects::Code,
        },
        ports::{
            repositories::{FeatureRepository, OutboxRepository, ProductRepository, ReleaseRepository},
            services::{ProductService, ReleaseService},
        },
        services::{ApplicationEventBus, ProductServiceImpl, ReleaseServiceImpl},
    };

    struct Fixture {
        store: InMemoryStore,
        service: FeatureServiceImpl,
        dispatcher: Arc<EventDispatcher>,
        bus: ApplicationEventBus,
    }

    impl Fixture {
        /// Deliver whatever the writes so far left in the outbox
        async fn deliver(&self) {
            self.dispatcher.dispatch_pending().await.unwrap();
        }
    }

    async fn create_fixture() -> Fixture {
        let memory = InMemoryStore::new();
        let store: Arc<dyn TransactionManager> = Arc::new(memory.clone());
        let bus = ApplicationEventBus::new();
        let dispatcher = Arc::new(EventDispatcher::new(
            store.clone(),
            Arc::new(LoggingEventPublisher::new()),
            bus.clone(),
        ));

        ProductServiceImpl::new(store.clone())
            .create_product(
                CreateProductCommand::builder()
                    .code(Code::new("intellij").unwrap())
                    .name("IntelliJ IDEA")
                    .created_by("admin")
                    .build(),
            )
            .await
            .unwrap();
        ReleaseServiceImpl::new(store.clone())
            .create_release(
                CreateReleaseCommand::builder()
                    .product_code("intellij")
                    .code(Code::new("IDEA-2023.3.8").unwrap())
                    .created_by("admin")
                    .build(),
            )
            .await
            .unwrap();

        Fixture {
            store: memory,
            service: FeatureServiceImpl::new(store, dispatcher.clone()),
            dispatcher,
            bus,
        }
    }

    fn create_cmd(code: &str) -> CreateFeatureCommand {
        CreateFeatureCommand::builder()
            .product_code("intellij")
            .release_code("IDEA-2023.3.8")
            .code(Code::new(code).unwrap())
            .title("Event Test Feature")
            .created_by("siva")
            .build()
    }

    #[tokio::test]
    async fn test_create_feature_publishes_one_event() {
        let fixture = create_fixture().await;
        let mut events = fixture.bus.subscribe();

        let id = fixture.service.create_feature(create_cmd("F1")).await.unwrap();

        let feature = fixture
            .service
            .find_feature_by_code("F1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(feature.id, id);
        assert_eq!(feature.status, FeatureStatus::New);
        assert_eq!(feature.audit.created_by, "siva");
        assert_eq!(feature.product_code.as_str(), "intellij");

        // Writes only wake the relay; nothing was delivered inline
        assert!(events.try_recv().is_err());

        fixture.deliver().await;
        let event = events.recv().await.unwrap();
        assert_eq!(event.event.kind(), FeatureEventKind::Created);
        assert_eq!(event.event.feature(), &feature);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_feature_in_unknown_release() {
        let fixture = create_fixture().await;
        let mut events = fixture.bus.subscribe();

        let cmd = CreateFeatureCommand::builder()
            .product_code("intellij")
            .release_code("IDEA-0.0")
            .code(Code::new("F1").unwrap())
            .title("Orphan")
            .created_by("siva")
            .build();
        let result = fixture.service.create_feature(cmd).await;

        assert!(matches!(result, Err(TrackerError::ReleaseNotFound { .. })));
        assert!(!fixture.service.is_feature_exists("F1").await.unwrap());
        fixture.deliver().await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_feature_keeps_unaffected_fields() {
        let fixture = create_fixture().await;
        fixture.service.create_feature(create_cmd("F2")).await.unwrap();
        fixture.deliver().await;
        let mut events = fixture.bus.subscribe();

        let cmd = UpdateFeatureCommand::builder()
            .code("F2")
            .title("Event Test Feature")
            .status(FeatureStatus::InProgress)
            .assigned_to("marcobehler".to_string())
            .updated_by("editor")
            .build();
        fixture.service.update_feature(cmd).await.unwrap();

        let feature = fixture
            .service
            .find_feature_by_code("F2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(feature.status, FeatureStatus::InProgress);
        assert_eq!(feature.assigned_to.as_deref(), Some("marcobehler"));
        assert_eq!(feature.release_code.as_str(), "IDEA-2023.3.8");
        assert_eq!(feature.audit.created_by, "siva");
        assert_eq!(feature.audit.updated_by.as_deref(), Some("editor"));
        assert!(feature.audit.updated_at.is_some());

        fixture.deliver().await;
        let event = events.recv().await.unwrap();
        assert_eq!(event.event.kind(), FeatureEventKind::Updated);
    }

    #[tokio::test]
    async fn test_delete_feature_carries_snapshot() {
        let fixture = create_fixture().await;
        fixture.service.create_feature(create_cmd("F3")).await.unwrap();
        fixture.deliver().await;
        let mut events = fixture.bus.subscribe();

        let cmd = DeleteFeatureCommand::builder()
            .code("F3")
            .deleted_by("admin")
            .build();
        fixture.service.delete_feature(cmd).await.unwrap();

        assert!(!fixture.service.is_feature_exists("F3").await.unwrap());
        fixture.deliver().await;
        let event = events.recv().await.unwrap();
        match &event.event {
            FeatureEvent::Deleted {
                feature,
                deleted_by,
                ..
            } => {
                assert_eq!(feature.code.as_str(), "F3");
                assert_eq!(deleted_by, "admin");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_feature_writes_emit_nothing() {
        let fixture = create_fixture().await;
        let mut events = fixture.bus.subscribe();

        let update = UpdateFeatureCommand::builder()
            .code("missing")
            .title("Nothing")
            .updated_by("editor")
            .build();
        assert!(matches!(
            fixture.service.update_feature(update).await,
            Err(TrackerError::FeatureNotFound { .. })
        ));

        let delete = DeleteFeatureCommand::builder()
            .code("missing")
            .deleted_by("admin")
            .build();
        assert!(matches!(
            fixture.service.delete_feature(delete).await,
            Err(TrackerError::FeatureNotFound { .. })
        ));

        fixture.deliver().await;
        assert!(events.try_recv().is_err());
    }

    /// Outbox that refuses every append
    struct UnavailableOutbox;

    #[async_trait]
    impl OutboxRepository for UnavailableOutbox {
        async fn append(&mut self, _envelope: &EventEnvelope) -> TrackerResult<OutboxRecord> {
            Err(TrackerError::infrastructure("outbox unavailable"))
        }

        async fn find_pending(&mut self, _limit: usize) -> TrackerResult<Vec<OutboxRecord>> {
            Ok(Vec::new())
        }

        async fn mark_dispatched(&mut self, _id: i64, _at: DateTime<Utc>) -> TrackerResult<()> {
            Ok(())
        }

        async fn purge_dispatched(&mut self, _before: DateTime<Utc>) -> TrackerResult<u64> {
            Ok(0)
        }
    }

    /// Real entity repositories paired with [`UnavailableOutbox`]
    struct OutboxFailingTransaction {
        inner: Box<dyn Transaction>,
        outbox: UnavailableOutbox,
    }

    #[async_trait]
    impl Transaction for OutboxFailingTransaction {
        fn products(&mut self) -> &mut dyn ProductRepository {
            self.inner.products()
        }

        fn releases(&mut self) -> &mut dyn ReleaseRepository {
            self.inner.releases()
        }

        fn features(&mut self) -> &mut dyn FeatureRepository {
            self.inner.features()
        }

        fn outbox(&mut self) -> &mut dyn OutboxRepository {
            &mut self.outbox
        }

        async fn commit(&mut self) -> TrackerResult<()> {
            self.inner.commit().await
        }

        async fn rollback(&mut self) -> TrackerResult<()> {
            self.inner.rollback().await
        }
    }

    struct OutboxFailingStore(InMemoryStore);

    #[async_trait]
    impl TransactionManager for OutboxFailingStore {
        async fn begin(&self, mode: TransactionMode) -> TrackerResult<Box<dyn Transaction>> {
            Ok(Box::new(OutboxFailingTransaction {
                inner: self.0.begin(mode).await?,
                outbox: UnavailableOutbox,
            }))
        }
    }

    #[tokio::test]
    async fn test_outbox_failure_rolls_back_the_write() {
        let fixture = create_fixture().await;
        fixture.service.create_feature(create_cmd("F1")).await.unwrap();
        fixture.deliver().await;

        let failing = FeatureServiceImpl::new(
            Arc::new(OutboxFailingStore(fixture.store.clone())),
            fixture.dispatcher.clone(),
        );

        let created = failing.create_feature(create_cmd("F2")).await;
        assert!(matches!(created, Err(TrackerError::Infrastructure { .. })));
        assert!(!fixture.service.is_feature_exists("F2").await.unwrap());

        let update = UpdateFeatureCommand::builder()
            .code("F1")
            .title("Renamed")
            .status(FeatureStatus::Done)
            .updated_by("editor")
            .build();
        assert!(failing.update_feature(update).await.is_err());

        let delete = DeleteFeatureCommand::builder()
            .code("F1")
            .deleted_by("admin")
            .build();
        assert!(failing.delete_feature(delete).await.is_err());

        let feature = fixture
            .service
            .find_feature_by_code("F1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(feature.title, "Event Test Feature");
        assert_eq!(feature.status, FeatureStatus::New);
        assert!(feature.audit.updated_by.is_none());
    }
}
