//! Atomic batch claiming.

use std::sync::Arc;

use tracing::{debug, warn};

use batchrelay_storage::{
    ClaimTransaction, ItemStatus, RecordStore, StorageError, StorageResult, WorkItem,
};

use crate::error::{DomainError, DomainResult};

/// Claim attempts before a persistently conflicting batch is surfaced as
/// fatal. Conflicts only arise from concurrent runs racing over the same
/// candidates, so a couple of retries is normally enough.
pub const DEFAULT_CLAIM_ATTEMPTS: u32 = 3;

/// Claims bounded batches of `Received` items inside one store transaction.
///
/// The whole claim is atomic: either every surviving candidate transitions
/// to `Queued` in one commit, or the attempt is retried from scratch. No
/// partial claim is ever observable, and two concurrent runs can never both
/// claim the same item.
pub struct BatchClaimer<S: RecordStore> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S: RecordStore> BatchClaimer<S> {
    /// Creates a claimer with the default conflict-retry budget.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_CLAIM_ATTEMPTS,
        }
    }

    /// Overrides the conflict-retry budget (must be at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Atomically claims up to `limit` eligible items, stamping `batch_id`.
    ///
    /// Returns the items that were actually transitioned. An empty result
    /// means no eligible items remain; it is the orchestration loop's
    /// termination signal, not an error.
    pub async fn claim(&self, limit: usize, batch_id: &str) -> DomainResult<Vec<WorkItem>> {
        for attempt in 1..=self.max_attempts {
            match self.try_claim(limit, batch_id).await {
                Ok(items) => return Ok(items),
                Err(StorageError::TransactionConflict { item_id }) => {
                    warn!(
                        %batch_id,
                        %item_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "claim transaction conflicted, retrying from scratch"
                    );
                }
                Err(source) => return Err(DomainError::Store { source }),
            }
        }
        Err(DomainError::ClaimContention {
            attempts: self.max_attempts,
        })
    }

    /// One claim attempt: query, re-check, stamp, commit.
    async fn try_claim(&self, limit: usize, batch_id: &str) -> StorageResult<Vec<WorkItem>> {
        let mut tx = self.store.begin().await?;
        let candidates = tx.query_received(limit).await?;

        let mut claimed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            // Re-check within the transaction's consistent read: a query
            // path serving stale snapshots must not smuggle in an item a
            // concurrent run already moved on.
            if candidate.status != ItemStatus::Received {
                debug!(item_id = %candidate.id, "candidate no longer eligible, skipping");
                continue;
            }
            tx.mark_queued(&candidate.id, batch_id).await?;
            claimed.push(candidate);
        }

        if claimed.is_empty() {
            // Nothing to write; dropping the transaction aborts it.
            return Ok(Vec::new());
        }

        tx.commit().await?;

        // Reflect the committed transition on the returned records.
        for item in &mut claimed {
            item.status = ItemStatus::Queued;
            item.batch_id = Some(batch_id.to_string());
        }
        Ok(claimed)
    }
}
