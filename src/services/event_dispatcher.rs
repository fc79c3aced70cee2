use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    domain::{errors::TrackerResult, models::OutboxRecord},
    ports::{
        events::EventPublisher,
        repositories::{complete, TransactionManager, TransactionMode},
    },
    services::ApplicationEventBus,
};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_RETENTION_DAYS: i64 = 7;
const MIN_RELAY_INTERVAL: Duration = Duration::from_millis(100);

/// Delivers committed outbox records to the configured publisher, then to
/// in-process listeners.
///
/// Records are delivered oldest first. A record stays pending until the
/// publisher accepts it, so delivery is at-least-once; consumers de-duplicate
/// on `eventId`.
pub struct EventDispatcher {
    transactions: Arc<dyn TransactionManager>,
    publisher: Arc<dyn EventPublisher>,
    bus: ApplicationEventBus,
    batch_size: usize,
    retention: chrono::Duration,
    // One delivery run at a time, otherwise a record could be published twice
    running: Mutex<()>,
    wake: Notify,
}

impl EventDispatcher {
    pub fn new(
        transactions: Arc<dyn TransactionManager>,
        publisher: Arc<dyn EventPublisher>,
        bus: ApplicationEventBus,
    ) -> Self {
        Self {
            transactions,
            publisher,
            bus,
            batch_size: DEFAULT_BATCH_SIZE,
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
            running: Mutex::new(()),
            wake: Notify::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// How long delivered records are kept before the relay purges them
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::days(DEFAULT_RETENTION_DAYS));
        self
    }

    pub fn event_bus(&self) -> &ApplicationEventBus {
        &self.bus
    }

    /// Deliver every pending record and return how many were delivered.
    ///
    /// Stops at the first publisher failure, leaving that record and all later
    /// ones pending.
    pub async fn dispatch_pending(&self) -> TrackerResult<usize> {
        let _running = self.running.lock().await;
        let mut delivered = 0;

        loop {
            let pending = self.load_pending().await?;
            let fetched = pending.len();

            for record in pending {
                self.deliver(record).await?;
                delivered += 1;
            }

            if fetched < self.batch_size {
                break;
            }
        }

        if delivered > 0 {
            debug!(delivered, "Feature events delivered");
        }
        Ok(delivered)
    }

    /// Wake the relay after a write committed new records.
    ///
    /// Returns immediately; wake-ups arriving during a run coalesce into one more run.
    pub fn request_dispatch(&self) {
        self.wake.notify_one();
    }

    /// Remove delivered records older than the retention period
    pub async fn purge_dispatched(&self) -> TrackerResult<u64> {
        let before = Utc::now() - self.retention;
        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = tx.outbox().purge_dispatched(before).await;
        complete(tx, result).await
    }

    /// Run delivery whenever a write asks for it, and on every tick of `interval`
    /// to retry records left pending by earlier failures.
    pub fn spawn_relay(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let interval = interval.max(MIN_RELAY_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let scheduled = tokio::select! {
                    _ = ticker.tick() => true,
                    _ = self.wake.notified() => false,
                };

                if let Err(e) = self.dispatch_pending().await {
                    warn!(error = %e, "Feature event delivery failed, will retry");
                }

                if scheduled {
                    match self.purge_dispatched().await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Purged delivered outbox records"),
                        Err(e) => warn!(error = %e, "Outbox purge failed"),
                    }
                }
            }
        })
    }

    async fn load_pending(&self) -> TrackerResult<Vec<OutboxRecord>> {
        let mut tx = self.transactions.begin(TransactionMode::ReadOnly).await?;
        let result = tx.outbox().find_pending(self.batch_size).await;
        complete(tx, result).await
    }

    async fn deliver(&self, record: OutboxRecord) -> TrackerResult<()> {
        self.publisher.publish(&record.envelope).await?;

        let mut tx = self.transactions.begin(TransactionMode::ReadWrite).await?;
        let result = tx.outbox().mark_dispatched(record.id, Utc::now()).await;
        complete(tx, result).await?;

        self.bus.notify(record.envelope);
        Ok(())
    }
}
