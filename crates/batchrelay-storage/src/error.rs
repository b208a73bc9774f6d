//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Work item not found.
    #[error("work item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Commit-time write conflict with a concurrent transaction.
    ///
    /// The whole claim attempt must be retried from scratch; no partial
    /// claim is observable.
    #[error("transaction conflict on {item_id}: record changed since transaction snapshot")]
    TransactionConflict { item_id: String },

    /// Backend transport or connection failure. Fatal for the current run.
    #[error("record store unavailable: {message}")]
    Unavailable { message: String },

    /// A write was attempted on a transaction that already committed.
    #[error("transaction already committed")]
    TransactionClosed,

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    Internal { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
