//! Application state for HTTP handlers.

use std::sync::Arc;

use batchrelay_domain::{BatchClaimer, DispatchPublisher, WorkflowOrchestrator};
use batchrelay_queue::QueueSink;
use batchrelay_storage::RecordStore;

use crate::auth::CredentialVerifier;

/// Application state shared across all HTTP handlers.
///
/// Every dependency is injected through the constructor; handlers reach
/// nothing global. The store appears twice on purpose: once inside the
/// orchestrator for claiming, and once directly for the readiness probe.
///
/// # Type Parameters
///
/// * `S` - record store backend
/// * `Q` - dispatch queue sink
/// * `V` - bearer credential verifier
pub struct AppState<S: RecordStore, Q: QueueSink, V: CredentialVerifier> {
    /// The claim → publish drive loop.
    pub orchestrator: WorkflowOrchestrator<S, Q>,
    /// Verifies the `Authorization: Bearer` credential on trigger calls.
    pub verifier: Arc<V>,
    /// Store handle for the readiness probe.
    pub store: Arc<S>,
}

impl<S: RecordStore, Q: QueueSink, V: CredentialVerifier> AppState<S, Q, V> {
    /// Wires the orchestration pipeline from its parts.
    ///
    /// `per_batch_size` is the per-transaction claim size and `max_total`
    /// caps how many items one trigger invocation may process.
    pub fn new(
        store: Arc<S>,
        sink: Arc<Q>,
        verifier: Arc<V>,
        per_batch_size: usize,
        max_total: usize,
    ) -> Self {
        let orchestrator = WorkflowOrchestrator::new(
            BatchClaimer::new(Arc::clone(&store)),
            DispatchPublisher::new(sink),
            per_batch_size,
            max_total,
        );

        Self {
            orchestrator,
            verifier,
            store,
        }
    }
}
