//! Dispatch message fan-out.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use batchrelay_queue::{DispatchMessage, QueueSink};
use batchrelay_storage::WorkItem;

/// Per-batch publish report.
///
/// Failed ids are surfaced for logging and external reconciliation only;
/// the already-committed `Queued` transition is never rolled back, and no
/// re-publish is attempted here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Messages the sink acknowledged.
    pub acknowledged: usize,
    /// Document ids whose publish failed, in batch order.
    pub failed: Vec<String>,
}

impl PublishOutcome {
    /// True when every message of the batch was acknowledged.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Publishes one dispatch message per claimed item and waits for every
/// acknowledgment.
///
/// Items arrive here already committed as `Queued`; claiming strictly
/// precedes publishing, so a crash in between leaves an item queued but
/// undelivered (the documented at-least-once gap).
pub struct DispatchPublisher<Q: QueueSink> {
    sink: Arc<Q>,
}

impl<Q: QueueSink> DispatchPublisher<Q> {
    pub fn new(sink: Arc<Q>) -> Self {
        Self { sink }
    }

    /// Publishes the batch concurrently and reports per-item outcomes.
    ///
    /// Submissions fan out to amortize sink latency across the batch; the
    /// batch counts as dispatched only after every publish has resolved.
    pub async fn publish_batch(&self, items: &[WorkItem], batch_id: &str) -> PublishOutcome {
        let publishes = items.iter().map(|item| {
            let message = DispatchMessage::new(&item.id, batch_id);
            async move {
                match self.sink.publish(&message).await {
                    Ok(()) => Ok(()),
                    Err(error) => {
                        warn!(
                            document_id = %message.document_id,
                            %batch_id,
                            %error,
                            "dispatch publish failed"
                        );
                        Err(message.document_id)
                    }
                }
            }
        });

        let mut outcome = PublishOutcome::default();
        for result in join_all(publishes).await {
            match result {
                Ok(()) => outcome.acknowledged += 1,
                Err(document_id) => outcome.failed.push(document_id),
            }
        }
        outcome
    }
}
