//! batchrelay-queue: Dispatch queue sink abstraction
//!
//! This crate provides the outbound queue abstraction for batchrelay:
//! - QueueSink trait for acknowledged, at-least-once publishing
//! - DispatchMessage wire value
//! - In-memory implementation with failure injection for tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             batchrelay-queue                 │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - QueueSink / DispatchMessage   │
//! │  memory.rs   - In-memory implementation      │
//! │  error.rs    - QueueError taxonomy           │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{QueueError, QueueResult};
pub use memory::MemoryQueueSink;
pub use traits::{DispatchMessage, QueueSink};
