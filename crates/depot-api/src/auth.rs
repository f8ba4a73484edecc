//! Bearer token authentication.
//!
//! `auth_middleware` resolves the `Authorization` header through the
//! configured [`AccessPolicy`] and stores the resulting caller in the request
//! extensions. Handlers take an [`AuthCaller`] argument to read it back.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use depot_core::AppError;
use depot_services::Caller;
use std::sync::Arc;

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = match state.access.authenticate(bearer_token(request.headers())) {
        Ok(caller) => caller,
        Err(err) => {
            tracing::debug!(
                path = %request.uri().path(),
                error = %err,
                "Authentication failed"
            );
            return HttpAppError(err).into_response();
        }
    };

    tracing::trace!(caller = %caller.label, "Request authenticated");
    request.extensions_mut().insert(AuthCaller(caller));
    next.run(request).await
}

// Read from extensions so the extractor works alongside Multipart
impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCaller>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Missing caller context".to_string())))
    }
}
