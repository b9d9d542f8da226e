//! API middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pollbox_common::AppError;
use pollbox_core::PollService;

use crate::auth::TokenVerifier;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Poll operations.
    pub poll_service: PollService,
    /// Bearer token checks for [`auth_middleware`].
    pub token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(poll_service: PollService, token_verifier: TokenVerifier) -> Self {
        Self {
            poll_service,
            token_verifier: Arc::new(token_verifier),
        }
    }
}

/// Authentication middleware.
///
/// A request without an `Authorization` header proceeds anonymously. A
/// request with a header that is not a valid bearer token is rejected with
/// 401 rather than downgraded to anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        let Some(token) = token else {
            return AppError::Unauthenticated.into_response();
        };

        match state.token_verifier.verify(token) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
