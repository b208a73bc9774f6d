//! Observability infrastructure.
//!
//! Structured logging via `tracing-subscriber`: JSON output for production,
//! pretty text for development.

mod logging;

pub use logging::{init_logging, parse_log_level, LoggingConfig};
