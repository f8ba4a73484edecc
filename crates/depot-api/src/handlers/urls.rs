use crate::auth::AuthCaller;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use depot_core::models::{
    BatchSignedUrlRequest, BatchSignedUrlResponse, SignedUrlRequest, SignedUrlResponse,
};
use depot_core::AppError;
use std::sync::Arc;
use validator::Validate;

/// Resolve a time-limited GET URL for one stored object
#[utoipa::path(
    post,
    path = "/api/v0/urls/signed",
    tag = "urls",
    request_body = SignedUrlRequest,
    responses(
        (status = 200, description = "Signed URL issued", body = SignedUrlResponse),
        (status = 400, description = "Invalid object key", body = ErrorResponse),
        (status = 404, description = "Object not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(caller = %caller.label, object_key = %request.object_key))]
pub async fn get_signed_url(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignedUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let presigned = state.resolver.resolve_one(&request.object_key).await?;
    Ok(Json(SignedUrlResponse {
        signed_url: presigned.url,
        expires_at: presigned.expires_at,
    }))
}

/// Resolve GET URLs for many objects at once
///
/// Keys that cannot be resolved are listed in `errors` instead of failing the request.
#[utoipa::path(
    post,
    path = "/api/v0/urls/signed/batch",
    tag = "urls",
    request_body = BatchSignedUrlRequest,
    responses(
        (status = 200, description = "Batch resolved", body = BatchSignedUrlResponse),
        (status = 400, description = "Too many keys", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(caller = %caller.label, requested = request.object_keys.len()))]
pub async fn get_signed_urls_batch(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<BatchSignedUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.resolver.resolve_batch(&request.object_keys).await?;
    Ok(Json(response))
}
