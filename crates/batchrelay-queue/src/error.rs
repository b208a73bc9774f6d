//! Queue sink error types.

use thiserror::Error;

/// Queue-specific errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The sink rejected or failed to acknowledge a single message.
    #[error("publish rejected for {document_id}: {message}")]
    PublishRejected { document_id: String, message: String },

    /// Transport or backend failure reaching the sink.
    #[error("queue sink unavailable: {message}")]
    SinkUnavailable { message: String },

    /// Message failed to serialize to its wire form.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
