//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use ulid::Ulid;

use batchrelay_domain::{OrchestrationResult, RunOutcome};
use batchrelay_queue::QueueSink;
use batchrelay_storage::RecordStore;

use super::state::AppState;
use crate::auth::{AuthError, CredentialVerifier};

/// Default request body size limit (64KB). The trigger endpoint takes no
/// body, so anything larger is noise.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Creates the HTTP router with the trigger and probe endpoints.
pub fn create_router<S, Q, V>(state: AppState<S, Q, V>) -> Router
where
    S: RecordStore,
    Q: QueueSink,
    V: CredentialVerifier,
{
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S, Q, V>(state: AppState<S, Q, V>, body_limit: usize) -> Router
where
    S: RecordStore,
    Q: QueueSink,
    V: CredentialVerifier,
{
    let shared_state = Arc::new(state);
    Router::new()
        .route("/trigger-workflow", post(trigger_workflow::<S, Q, V>))
        // Health and readiness checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S, Q, V>))
        .with_state(shared_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
}

// ============================================================
// Error Handling
// ============================================================

/// Error payload returned by every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: &'static str,
    pub message: String,
    #[serde(skip)]
    status_code: StatusCode,
}

impl ApiError {
    fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            status_code,
        }
    }

    /// 401: the caller presented no usable credential.
    fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "missing or malformed Authorization header",
        )
    }

    /// 403: the credential was presented but rejected.
    fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "credential rejected")
    }

    /// 500: the run hit a fatal store or sink error. The message is a
    /// category, never an internal error chain.
    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

// ============================================================
// Trigger Endpoint
// ============================================================

/// Success payload of `POST /trigger-workflow`.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "processedCount")]
    pub processed_count: usize,
    #[serde(rename = "batchId")]
    pub batch_id: String,
}

impl TriggerResponse {
    fn from_result(result: &OrchestrationResult) -> Self {
        let mut message = format!(
            "Workflow started. Queued {} items for processing.",
            result.processed_count
        );
        if result.unacknowledged > 0 {
            message.push_str(&format!(
                " Failed to queue {} items.",
                result.unacknowledged
            ));
        }
        Self {
            status: "success",
            message,
            processed_count: result.processed_count,
            batch_id: result.batch_id.clone(),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` for a missing header, a non-Bearer scheme, or an empty
/// token, all of which map to 401.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = value.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// `POST /trigger-workflow` - claim pending work items and dispatch them.
///
/// Authentication is explicit and first: no claim is attempted until the
/// bearer credential verifies. Each invocation mints a fresh batch id that
/// tags every item claimed during the run.
async fn trigger_workflow<S, Q, V>(
    State(state): State<Arc<AppState<S, Q, V>>>,
    headers: HeaderMap,
) -> Result<Json<TriggerResponse>, ApiError>
where
    S: RecordStore,
    Q: QueueSink,
    V: CredentialVerifier,
{
    let token = bearer_token(&headers).ok_or_else(|| {
        warn!("trigger rejected: no bearer credential");
        ApiError::unauthenticated()
    })?;

    let identity = state.verifier.verify(token).await.map_err(|err| match err {
        AuthError::Missing => {
            warn!("trigger rejected: empty credential");
            ApiError::unauthenticated()
        }
        AuthError::Invalid { reason } => {
            warn!(%reason, "trigger rejected: credential failed verification");
            ApiError::forbidden()
        }
    })?;

    let batch_id = Ulid::new().to_string();
    info!(
        %batch_id,
        subject = identity.subject.as_deref().unwrap_or("unknown"),
        "workflow trigger accepted"
    );

    let result = state.orchestrator.run(&batch_id).await;
    match &result.outcome {
        RunOutcome::Completed => Ok(Json(TriggerResponse::from_result(&result))),
        RunOutcome::Failed { message } => {
            error!(
                %batch_id,
                %message,
                processed_count = result.processed_count,
                "workflow run failed"
            );
            Err(ApiError::internal("workflow run failed"))
        }
    }
}

// ============================================================
// Probes
// ============================================================

/// Liveness probe. Always 200: the process being able to answer is the
/// whole check. Dependency state belongs to `/ready`.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Readiness probe. 200 when the record store answers a ping, 503 when it
/// does not. Error details are logged but not exposed in the response.
async fn readiness_check<S, Q, V>(State(state): State<Arc<AppState<S, Q, V>>>) -> impl IntoResponse
where
    S: RecordStore,
    Q: QueueSink,
    V: CredentialVerifier,
{
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "checks": { "record_store": "ok" }
            })),
        ),
        Err(e) => {
            error!("readiness check failed: record store unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "checks": { "record_store": "unavailable" }
                })),
            )
        }
    }
}
