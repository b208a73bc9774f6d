//! HTTP surface of the trigger service.
//!
//! | Endpoint            | Method | Description                         |
//! |---------------------|--------|-------------------------------------|
//! | `/trigger-workflow` | POST   | Claim and dispatch pending items    |
//! | `/health`           | GET    | Liveness probe (always 200)         |
//! | `/ready`            | GET    | Readiness probe (pings the store)   |

pub mod routes;
pub mod state;

pub use routes::{
    create_router, create_router_with_body_limit, ApiError, TriggerResponse, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;

#[cfg(test)]
mod tests;
