//! Batchrelay server binary.
//!
//! Workflow trigger service: an authenticated endpoint that claims pending
//! work items from the record store in bounded batches and publishes one
//! dispatch message per item to the outbound queue.
//!
//! # Usage
//!
//! ```bash
//! RECORD_STORE_PROJECT_ID=my-project \
//! DISPATCH_TOPIC_ID=article-processing \
//! EXPECTED_AUDIENCE=https://trigger.example.com \
//! JWT_HS256_SECRET=... \
//! batchrelay
//! ```

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use batchrelay_api::auth::{JwtVerifier, VerifierConfig};
use batchrelay_api::http::{create_router, AppState};
use batchrelay_api::observability::{init_logging, parse_log_level, LoggingConfig};
use batchrelay_api::AppConfig;
use batchrelay_queue::MemoryQueueSink;
use batchrelay_storage::MemoryRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is validated before anything else: a misconfigured
    // process must crash at startup, not at first request.
    let config = AppConfig::from_env()?;

    init_logging(LoggingConfig {
        json_format: config.log_json,
        default_level: parse_log_level(&config.log_level),
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting batchrelay server"
    );
    info!(
        project_id = %config.record_store_project_id,
        collection = %config.collection_name,
        topic_id = %config.dispatch_topic_id,
        batch_size = config.batch_size,
        max_documents = config.max_documents_per_request,
        "configuration loaded"
    );

    let store = MemoryRecordStore::new_shared();
    let sink = MemoryQueueSink::new_shared();
    let verifier = Arc::new(JwtVerifier::new(VerifierConfig::from_app_config(&config)));

    let state = AppState::new(
        store,
        sink,
        verifier,
        config.batch_size,
        config.max_documents_per_request,
    );
    let router = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM, letting in-flight requests
/// finish before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
