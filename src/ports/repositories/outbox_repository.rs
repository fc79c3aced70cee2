use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    errors::TrackerResult,
    models::{EventEnvelope, OutboxRecord},
};

/// Durable queue of feature events awaiting delivery
#[async_trait]
pub trait OutboxRepository: Send {
    /// Record an event as part of the current transaction
    async fn append(&mut self, envelope: &EventEnvelope) -> TrackerResult<OutboxRecord>;

    /// Oldest undelivered records first
    async fn find_pending(&mut self, limit: usize) -> TrackerResult<Vec<OutboxRecord>>;

    /// Mark a record as delivered
    async fn mark_dispatched(&mut self, id: i64, at: DateTime<Utc>) -> TrackerResult<()>;

    /// Remove records delivered before `before`, returning how many were removed
    async fn purge_dispatched(&mut self, before: DateTime<Utc>) -> TrackerResult<u64>;
}
