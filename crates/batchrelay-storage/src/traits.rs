//! RecordStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;

/// Lifecycle status of a work item.
///
/// Downstream consumers move items past `Queued`; those later states are
/// outside this service and never written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    /// Ingested upstream and eligible for claiming.
    Received,
    /// Claimed by an orchestration run and handed to the dispatch queue.
    Queued,
}

impl ItemStatus {
    /// Returns the wire representation used by the record collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Received => "received",
            ItemStatus::Queued => "queued",
        }
    }
}

/// A durable work-item record.
///
/// Created by an upstream ingestion process; this service mutates it exactly
/// once, `Received` → `Queued`, stamping `queued_at` and `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub status: ItemStatus,
    pub queued_at: Option<DateTime<Utc>>,
    pub batch_id: Option<String>,
}

impl WorkItem {
    /// Creates a freshly ingested item, eligible for claiming.
    pub fn received(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Received,
            queued_at: None,
            batch_id: None,
        }
    }
}

/// Abstract record store interface for work items.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations. Correctness of claiming rests entirely on the
/// transaction primitive exposed here; the store never requires callers
/// to hold their own locks.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// The scoped transaction type for this backend.
    type Tx: ClaimTransaction;

    /// Opens a claim transaction with a consistent read snapshot.
    async fn begin(&self) -> StorageResult<Self::Tx>;

    /// Cheap connectivity probe used by the readiness check.
    async fn ping(&self) -> StorageResult<()>;
}

/// A scoped claim transaction.
///
/// Writes are buffered until [`commit`](ClaimTransaction::commit). Dropping
/// the transaction without committing aborts it; nothing becomes visible to
/// other transactions. Commit fails with `TransactionConflict` if any record
/// written by this transaction changed since the transaction's snapshot, in
/// which case no write is applied.
#[async_trait]
pub trait ClaimTransaction: Send {
    /// Reads up to `limit` items whose snapshot status is `Received`, in the
    /// backend's stable order.
    async fn query_received(&mut self, limit: usize) -> StorageResult<Vec<WorkItem>>;

    /// Buffers the `Received` → `Queued` transition for one item.
    ///
    /// `queued_at` is assigned by the store at commit time.
    async fn mark_queued(&mut self, item_id: &str, batch_id: &str) -> StorageResult<()>;

    /// Atomically applies all buffered writes, or none on conflict.
    async fn commit(self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_representation() {
        assert_eq!(ItemStatus::Received.as_str(), "received");
        assert_eq!(ItemStatus::Queued.as_str(), "queued");
    }

    #[test]
    fn received_item_has_no_claim_fields() {
        let item = WorkItem::received("doc-1");
        assert_eq!(item.status, ItemStatus::Received);
        assert!(item.queued_at.is_none());
        assert!(item.batch_id.is_none());
    }
}
