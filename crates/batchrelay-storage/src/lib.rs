//! batchrelay-storage: Record store abstraction layer
//!
//! This crate provides the storage abstraction for batchrelay, including:
//! - RecordStore trait for transactional work-item access
//! - ClaimTransaction scoped transaction value
//! - In-memory implementation for tests and the default runtime backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            batchrelay-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - RecordStore / ClaimTransaction│
//! │  memory.rs   - In-memory implementation      │
//! │  error.rs    - StorageError taxonomy         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRecordStore;
pub use traits::{ClaimTransaction, ItemStatus, RecordStore, WorkItem};
