//! API endpoints.

mod poll;

use axum::{Router, routing::get};

use crate::middleware::AppState;

pub use poll::{
    PollContentRequest, PollOptionResponse, PollResponse, PollResultsResponse, VoteRequest,
    VoteResponse,
};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/polls", poll::router())
}

/// Liveness probe.
pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(|| async { "ok" }))
}
