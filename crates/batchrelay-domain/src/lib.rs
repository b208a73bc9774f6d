//! batchrelay-domain: the claim-and-publish batching engine
//!
//! This crate contains the core workflow-trigger logic:
//! - BatchClaimer: atomic Received → Queued claiming with bounded retry
//! - DispatchPublisher: concurrent fan-out publishing with per-item outcomes
//! - WorkflowOrchestrator: the bounded claim → publish drive loop
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            batchrelay-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  claimer.rs      - Atomic batch claiming     │
//! │  publisher.rs    - Dispatch message fan-out  │
//! │  orchestrator.rs - Claim → publish loop      │
//! │  error.rs        - Domain error taxonomy     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine guarantees exactly-once *claiming* (the record store's
//! transaction isolation) composed with at-least-once *dispatch*: a crash
//! between claim commit and publish acknowledgment leaves items `queued`
//! but undelivered, which an external reconciliation sweep must pick up.

pub mod claimer;
pub mod error;
pub mod orchestrator;
pub mod publisher;

// Re-exports for convenience
pub use claimer::BatchClaimer;
pub use error::{DomainError, DomainResult};
pub use orchestrator::{OrchestrationResult, RunOutcome, WorkflowOrchestrator};
pub use publisher::{DispatchPublisher, PublishOutcome};
