//! The claim → publish drive loop.

use tracing::{error, info, warn};

use batchrelay_queue::QueueSink;
use batchrelay_storage::RecordStore;

use crate::claimer::BatchClaimer;
use crate::error::DomainError;
use crate::publisher::{DispatchPublisher, PublishOutcome};

/// Terminal state of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exhaustion (empty claim) or the per-request cap was reached.
    Completed,
    /// A fatal claim or publish error stopped the loop; the count covers
    /// the batches claimed before the failure.
    Failed { message: String },
}

/// Aggregate result of one trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationResult {
    pub batch_id: String,
    pub processed_count: usize,
    /// Claim batches that returned at least one item.
    pub batches: usize,
    /// Claimed items whose dispatch message was never acknowledged. The
    /// ids behind this count appear only in logs, never in responses.
    pub unacknowledged: usize,
    pub outcome: RunOutcome,
}

impl OrchestrationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }
}

/// Drives claim → publish batches until exhaustion, the per-request cap, or
/// a fatal error.
///
/// Runs move `Running → Completed` on an empty claim or a reached cap, and
/// `Running → Failed` the moment a fatal error surfaces; no further batch
/// is attempted after a failure. Batches execute strictly sequentially —
/// batch N+1's claim does not start until batch N's publishes have all
/// resolved — which bounds per-request concurrency and memory. Concurrent
/// runs are safe: the store's transaction isolation is the only
/// synchronization, and it is sufficient.
pub struct WorkflowOrchestrator<S: RecordStore, Q: QueueSink> {
    claimer: BatchClaimer<S>,
    publisher: DispatchPublisher<Q>,
    per_batch_size: usize,
    max_total: usize,
}

impl<S: RecordStore, Q: QueueSink> WorkflowOrchestrator<S, Q> {
    /// Creates an orchestrator with the configured batch size and
    /// per-request cap (both forced to at least 1).
    pub fn new(
        claimer: BatchClaimer<S>,
        publisher: DispatchPublisher<Q>,
        per_batch_size: usize,
        max_total: usize,
    ) -> Self {
        Self {
            claimer,
            publisher,
            per_batch_size: per_batch_size.max(1),
            max_total: max_total.max(1),
        }
    }

    /// Runs one orchestration under `batch_id`.
    ///
    /// Terminates after at most `ceil(max_total / per_batch_size)` claim
    /// iterations and never processes more than `max_total` items; the cap
    /// keeps a single request from draining the whole backlog and starving
    /// other callers.
    pub async fn run(&self, batch_id: &str) -> OrchestrationResult {
        let mut processed_count = 0usize;
        let mut batches = 0usize;
        let mut unacknowledged = 0usize;

        while processed_count < self.max_total {
            let limit = (self.max_total - processed_count).min(self.per_batch_size);

            let claimed = match self.claimer.claim(limit, batch_id).await {
                Ok(claimed) => claimed,
                Err(error) => {
                    error!(%batch_id, %error, processed_count, "claim failed, stopping run");
                    return self.failed(batch_id, processed_count, batches, unacknowledged, &error);
                }
            };

            if claimed.is_empty() {
                // Backlog exhausted: the normal termination signal.
                break;
            }

            batches += 1;
            let outcome = self.publisher.publish_batch(&claimed, batch_id).await;
            processed_count += claimed.len();
            unacknowledged += outcome.failed.len();
            self.log_publish(batch_id, &outcome, processed_count);

            if outcome.acknowledged == 0 {
                // Not one message of the batch got through: treat the sink
                // as unreachable. The items stay queued for reconciliation.
                let error = DomainError::SinkOutage {
                    batch_len: claimed.len(),
                };
                error!(%batch_id, %error, processed_count, "publish failed, stopping run");
                return self.failed(batch_id, processed_count, batches, unacknowledged, &error);
            }
        }

        info!(%batch_id, processed_count, batches, "orchestration run completed");
        OrchestrationResult {
            batch_id: batch_id.to_string(),
            processed_count,
            batches,
            unacknowledged,
            outcome: RunOutcome::Completed,
        }
    }

    fn log_publish(&self, batch_id: &str, outcome: &PublishOutcome, processed_count: usize) {
        if outcome.is_clean() {
            info!(
                %batch_id,
                acknowledged = outcome.acknowledged,
                processed_count,
                "batch dispatched"
            );
        } else {
            // The failed items remain `queued` but undelivered; an external
            // stale-item sweep must reconcile them. Callers only ever see
            // the aggregate count, so this log line is the partial-failure
            // signal.
            warn!(
                %batch_id,
                acknowledged = outcome.acknowledged,
                failed_count = outcome.failed.len(),
                failed_ids = ?outcome.failed,
                processed_count,
                "batch dispatched with unacknowledged items"
            );
        }
    }

    fn failed(
        &self,
        batch_id: &str,
        processed_count: usize,
        batches: usize,
        unacknowledged: usize,
        error: &DomainError,
    ) -> OrchestrationResult {
        OrchestrationResult {
            batch_id: batch_id.to_string(),
            processed_count,
            batches,
            unacknowledged,
            outcome: RunOutcome::Failed {
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use batchrelay_queue::MemoryQueueSink;
    use batchrelay_storage::{ItemStatus, MemoryRecordStore};

    use super::*;

    fn orchestrator(
        store: &Arc<MemoryRecordStore>,
        sink: &Arc<MemoryQueueSink>,
        per_batch: usize,
        max_total: usize,
    ) -> WorkflowOrchestrator<MemoryRecordStore, MemoryQueueSink> {
        WorkflowOrchestrator::new(
            BatchClaimer::new(Arc::clone(store)),
            DispatchPublisher::new(Arc::clone(sink)),
            per_batch,
            max_total,
        )
    }

    #[tokio::test]
    async fn cap_bounds_a_large_backlog() {
        let store = MemoryRecordStore::new_shared();
        let sink = MemoryQueueSink::new_shared();
        store.seed_received("doc", 30);

        let result = orchestrator(&store, &sink, 10, 25).run("batch-cap").await;

        assert!(result.is_success());
        assert_eq!(result.processed_count, 25);
        assert_eq!(result.batches, 3); // 10 + 10 + 5
        assert_eq!(store.count_with_status(ItemStatus::Received), 5);
        assert_eq!(sink.published_count(), 25);
    }

    #[tokio::test]
    async fn store_outage_fails_the_run() {
        let store = MemoryRecordStore::new_shared();
        let sink = MemoryQueueSink::new_shared();
        store.seed_received("doc", 10);

        let orch = orchestrator(&store, &sink, 5, 100);
        let result = orch.run("batch-1").await;
        assert_eq!(result.processed_count, 10);

        store.seed_received("late", 5);
        store.set_available(false);
        let result = orch.run("batch-2").await;
        assert_eq!(result.processed_count, 0);
        assert!(matches!(result.outcome, RunOutcome::Failed { .. }));
        assert_eq!(sink.published_count(), 10);
    }

    #[tokio::test]
    async fn sink_outage_fails_the_run_after_counting_claims() {
        let store = MemoryRecordStore::new_shared();
        let sink = MemoryQueueSink::new_shared();
        store.seed_received("doc", 8);
        sink.set_available(false);

        let result = orchestrator(&store, &sink, 5, 100).run("batch-down").await;

        assert!(matches!(result.outcome, RunOutcome::Failed { .. }));
        // The first batch was claimed before the outage surfaced; no
        // further batch was attempted.
        assert_eq!(result.processed_count, 5);
        assert_eq!(result.batches, 1);
        assert_eq!(store.count_with_status(ItemStatus::Queued), 5);
        assert_eq!(store.count_with_status(ItemStatus::Received), 3);
        assert_eq!(sink.published_count(), 0);
    }

    #[tokio::test]
    async fn partial_publish_failure_keeps_the_run_going() {
        let store = MemoryRecordStore::new_shared();
        let sink = MemoryQueueSink::new_shared();
        store.seed_received("doc", 6);
        sink.fail_document("doc-0001");

        let result = orchestrator(&store, &sink, 3, 100).run("batch-part").await;

        assert!(result.is_success());
        assert_eq!(result.processed_count, 6);
        assert_eq!(result.batches, 2);
        assert_eq!(result.unacknowledged, 1);
        // The failed item is still queued, not rolled back.
        assert_eq!(
            store.get("doc-0001").unwrap().status,
            ItemStatus::Queued
        );
        assert_eq!(sink.published_count(), 5);
    }
}
