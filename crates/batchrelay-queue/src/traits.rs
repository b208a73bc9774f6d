//! QueueSink trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{QueueError, QueueResult};

/// The dispatch message emitted once per claimed work item.
///
/// Ephemeral: owned by the publisher only until the sink acknowledges it.
/// Field order is irrelevant on the wire; content must round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMessage {
    /// The claimed work item's id.
    pub document_id: String,
    /// Correlation tag shared by every message of one orchestration run.
    pub batch_id: String,
}

impl DispatchMessage {
    pub fn new(document_id: impl Into<String>, batch_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            batch_id: batch_id.into(),
        }
    }

    /// Serializes the message to its JSON wire form.
    pub fn to_wire(&self) -> QueueResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| QueueError::Serialization {
            message: e.to_string(),
        })
    }
}

/// Abstract at-least-once publish sink.
///
/// `publish` resolves only once the sink has acknowledged the message; a
/// returned error means the message may or may not have been delivered, and
/// callers must treat the item as undispatched. Implementations must be
/// thread-safe (Send + Sync): the publisher fans out many publishes
/// concurrently within one batch.
#[async_trait]
pub trait QueueSink: Send + Sync + 'static {
    /// Publishes one message and waits for acknowledgment.
    async fn publish(&self, message: &DispatchMessage) -> QueueResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_through_wire_form() {
        let message = DispatchMessage::new("doc-7", "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        let wire = message.to_wire().unwrap();
        let back: DispatchMessage = serde_json::from_slice(&wire).unwrap();
        assert_eq!(back, message);
    }
}
