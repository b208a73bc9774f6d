//! In-memory record store implementation.
//!
//! Backs tests and the default runtime wiring. Items live in a `BTreeMap`
//! keyed by item id, which gives the stable claim order the claim loop
//! relies on for fairness. Each record carries a version counter; commit
//! re-validates versions against the transaction's snapshot, so two
//! interleaved claim transactions can never both transition the same item.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::traits::{ClaimTransaction, ItemStatus, RecordStore, WorkItem};

#[derive(Debug, Clone)]
struct Versioned {
    item: WorkItem,
    version: u64,
}

type Records = BTreeMap<String, Versioned>;

/// In-memory implementation of [`RecordStore`].
///
/// # Transaction semantics
///
/// `begin` captures a point-in-time snapshot of the whole collection.
/// Reads and buffered writes operate on that snapshot; `commit` takes one
/// critical section, verifies every written record is unchanged since the
/// snapshot (by version), and applies all writes or none.
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<Records>>,
    /// Outage switch for tests and readiness probing.
    available: AtomicBool,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Creates a new, empty in-memory record store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a new in-memory record store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Inserts or replaces a record, outside any transaction.
    ///
    /// Intended for seeding state in tests and local runs; upstream
    /// ingestion owns record creation in production.
    pub fn insert(&self, item: WorkItem) {
        let mut records = lock(&self.records);
        let version = records.get(&item.id).map_or(0, |v| v.version + 1);
        records.insert(item.id.clone(), Versioned { item, version });
    }

    /// Seeds the store with `count` received items named `{prefix}-{n}`.
    pub fn seed_received(&self, prefix: &str, count: usize) {
        for n in 0..count {
            self.insert(WorkItem::received(format!("{prefix}-{n:04}")));
        }
    }

    /// Returns a record by id, if present.
    pub fn get(&self, item_id: &str) -> Option<WorkItem> {
        lock(&self.records).get(item_id).map(|v| v.item.clone())
    }

    /// Counts records currently in the given status.
    pub fn count_with_status(&self, status: ItemStatus) -> usize {
        lock(&self.records)
            .values()
            .filter(|v| v.item.status == status)
            .count()
    }

    /// Flips the outage switch; while unavailable, `begin` and `ping` fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                message: "record store backend is offline".to_string(),
            })
        }
    }
}

/// The lock only guards short in-memory critical sections; a poisoned lock
/// means a panic mid-mutation, and the map itself is still structurally
/// sound, so recover the guard.
fn lock(records: &Mutex<Records>) -> MutexGuard<'_, Records> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    type Tx = MemoryClaimTransaction;

    async fn begin(&self) -> StorageResult<Self::Tx> {
        self.check_available()?;
        let snapshot = lock(&self.records).clone();
        Ok(MemoryClaimTransaction {
            records: Arc::clone(&self.records),
            snapshot,
            writes: Vec::new(),
        })
    }

    async fn ping(&self) -> StorageResult<()> {
        self.check_available()
    }
}

#[derive(Debug)]
struct PendingWrite {
    item_id: String,
    batch_id: String,
    snapshot_version: u64,
}

/// Scoped claim transaction over [`MemoryRecordStore`].
///
/// Dropping without commit discards the buffered writes; nothing was
/// applied, so abort needs no undo.
#[derive(Debug)]
pub struct MemoryClaimTransaction {
    records: Arc<Mutex<Records>>,
    snapshot: Records,
    writes: Vec<PendingWrite>,
}

#[async_trait]
impl ClaimTransaction for MemoryClaimTransaction {
    async fn query_received(&mut self, limit: usize) -> StorageResult<Vec<WorkItem>> {
        if limit == 0 {
            return Err(StorageError::InvalidInput {
                message: "query limit must be greater than zero".to_string(),
            });
        }
        // BTreeMap iteration order is the stable claim order.
        Ok(self
            .snapshot
            .values()
            .filter(|v| v.item.status == ItemStatus::Received)
            .take(limit)
            .map(|v| v.item.clone())
            .collect())
    }

    async fn mark_queued(&mut self, item_id: &str, batch_id: &str) -> StorageResult<()> {
        let versioned = self
            .snapshot
            .get(item_id)
            .ok_or_else(|| StorageError::ItemNotFound {
                item_id: item_id.to_string(),
            })?;
        self.writes.push(PendingWrite {
            item_id: item_id.to_string(),
            batch_id: batch_id.to_string(),
            snapshot_version: versioned.version,
        });
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        let mut records = lock(&self.records);

        // Validate every write before applying any: all-or-nothing.
        for write in &self.writes {
            let current =
                records
                    .get(&write.item_id)
                    .ok_or_else(|| StorageError::TransactionConflict {
                        item_id: write.item_id.clone(),
                    })?;
            if current.version != write.snapshot_version
                || current.item.status != ItemStatus::Received
            {
                return Err(StorageError::TransactionConflict {
                    item_id: write.item_id.clone(),
                });
            }
        }

        let queued_at = chrono::Utc::now();
        for write in self.writes {
            let versioned = records
                .get_mut(&write.item_id)
                .ok_or(StorageError::TransactionClosed)?;
            versioned.item.status = ItemStatus::Queued;
            versioned.item.queued_at = Some(queued_at);
            versioned.item.batch_id = Some(write.batch_id);
            versioned.version += 1;
        }
        Ok(())
    }
}
