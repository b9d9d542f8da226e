//! HTTP API layer for pollbox.
//!
//! - **Endpoints**: JSON routes for the poll service
//! - **Auth**: verification of identity-provider bearer tokens
//! - **Extractors**: the optional caller identity
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod auth;
pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use auth::{Claims, TokenVerifier};
pub use endpoints::router;
pub use middleware::AppState;

use axum::{Router, middleware as axum_middleware};

/// Build the full application: `/api` routes behind the auth middleware,
/// plus the health probe.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .merge(endpoints::health_router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
