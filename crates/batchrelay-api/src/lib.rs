//! batchrelay-api: HTTP boundary and process wiring
//!
//! This crate provides the external surface of the workflow trigger:
//! - HTTP endpoints via Axum (trigger, health, readiness)
//! - Bearer credential verification (JWT with mandatory audience check)
//! - Environment configuration, validated at startup
//! - Logging initialization
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              batchrelay-api                  │
//! ├─────────────────────────────────────────────┤
//! │  http/          - Routes and app state       │
//! │  auth.rs        - CredentialVerifier + JWT   │
//! │  config.rs      - Environment configuration  │
//! │  observability/ - Logging setup              │
//! └─────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod http;
pub mod observability;

pub use config::{AppConfig, ConfigLoadError};
