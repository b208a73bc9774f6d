//! Domain error types for the batching engine.

use batchrelay_storage::StorageError;
use thiserror::Error;

/// Fatal errors surfaced by one orchestration run.
///
/// Partial publish failures are deliberately not errors: they are reported
/// through [`PublishOutcome`](crate::publisher::PublishOutcome) and logged,
/// never rolled back.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The claim transaction kept conflicting with concurrent runs after
    /// bounded retries.
    #[error("claim abandoned after {attempts} conflicting attempts")]
    ClaimContention { attempts: u32 },

    /// Record store failure. Fatal for the current run.
    #[error("record store failure: {source}")]
    Store {
        #[from]
        source: StorageError,
    },

    /// No message of a non-empty batch was acknowledged; the sink is
    /// treated as unreachable. The batch's items stay `queued` in the
    /// store for reconciliation.
    #[error("queue sink unreachable: 0 of {batch_len} messages acknowledged")]
    SinkOutage { batch_len: usize },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
