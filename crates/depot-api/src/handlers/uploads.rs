use crate::auth::AuthCaller;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use depot_core::models::{FinalizeRequest, IssuePutRequest, IssuePutResponse, ObjectRecord};
use std::sync::Arc;

/// Issue a presigned PUT URL for direct upload to object storage
#[utoipa::path(
    post,
    path = "/api/v0/uploads/presigned",
    tag = "uploads",
    request_body = IssuePutRequest,
    responses(
        (status = 200, description = "Presigned URL generated", body = IssuePutResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Caller cannot write to the group", body = ErrorResponse),
        (status = 413, description = "File exceeds the category size ceiling", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller, request),
    fields(
        caller = %caller.label,
        group_id = %request.group_id,
        file_name = %request.file_name,
        operation = "issue_presigned_url"
    )
)]
pub async fn issue_presigned_url(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<IssuePutRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let presigned = state.issuer.issue_put_url(&caller, &request).await?;
    Ok(Json(IssuePutResponse::from(presigned)))
}

/// Register an uploaded object in the catalog
///
/// Finalizing the same `objectKey` twice returns the existing record.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/finalize",
    tag = "uploads",
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Object record registered", body = ObjectRecord),
        (status = 400, description = "Invalid input or foreign object key", body = ErrorResponse),
        (status = 403, description = "Caller cannot write to the group", body = ErrorResponse),
        (status = 404, description = "No object was uploaded under the key", body = ErrorResponse),
        (status = 500, description = "Catalog write failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, caller, request),
    fields(
        caller = %caller.label,
        group_id = %request.group_id,
        object_key = %request.object_key,
        operation = "finalize_upload"
    )
)]
pub async fn finalize_upload(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FinalizeRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.finalizer.finalize(&caller, request).await?;
    Ok(Json(record))
}
