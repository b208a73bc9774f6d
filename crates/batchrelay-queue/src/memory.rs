//! In-memory queue sink implementation.
//!
//! Records every acknowledged message so tests can assert exactly what
//! reached the sink, and supports per-document failure injection plus a
//! whole-sink outage switch to exercise the partial-failure paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{QueueError, QueueResult};
use crate::traits::{DispatchMessage, QueueSink};

/// In-memory implementation of [`QueueSink`].
#[derive(Debug)]
pub struct MemoryQueueSink {
    published: Mutex<Vec<DispatchMessage>>,
    failing_documents: Mutex<HashSet<String>>,
    available: AtomicBool,
}

impl Default for MemoryQueueSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueueSink {
    /// Creates a new, empty in-memory sink.
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing_documents: Mutex::new(HashSet::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a new in-memory sink wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// All messages acknowledged so far, in acknowledgment order.
    pub fn published(&self) -> Vec<DispatchMessage> {
        lock(&self.published).clone()
    }

    /// Number of acknowledged messages.
    pub fn published_count(&self) -> usize {
        lock(&self.published).len()
    }

    /// Makes publishes for the given document id fail with `PublishRejected`.
    pub fn fail_document(&self, document_id: impl Into<String>) {
        lock(&self.failing_documents).insert(document_id.into());
    }

    /// Flips the outage switch; while unavailable every publish fails with
    /// `SinkUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

fn lock<T>(value: &Mutex<T>) -> MutexGuard<'_, T> {
    value.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl QueueSink for MemoryQueueSink {
    async fn publish(&self, message: &DispatchMessage) -> QueueResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::SinkUnavailable {
                message: "queue sink backend is offline".to_string(),
            });
        }
        if lock(&self.failing_documents).contains(&message.document_id) {
            return Err(QueueError::PublishRejected {
                document_id: message.document_id.clone(),
                message: "injected publish failure".to_string(),
            });
        }
        // Exercise the wire form even in memory; a message that cannot
        // serialize must never count as acknowledged.
        message.to_wire()?;
        lock(&self.published).push(message.clone());
        Ok(())
    }
}
