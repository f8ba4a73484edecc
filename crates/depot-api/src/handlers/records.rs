use crate::auth::AuthCaller;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use depot_core::models::ObjectRecord;
use depot_core::validation::validate_group_id;
use std::sync::Arc;
use uuid::Uuid;

/// List the object records registered for a group, newest last
#[utoipa::path(
    get,
    path = "/api/v0/groups/{group_id}/records",
    tag = "records",
    params(("group_id" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Records of the group", body = Vec<ObjectRecord>),
        (status = 400, description = "Invalid group id", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, _caller), fields(group_id = %group_id))]
pub async fn list_group_records(
    AuthCaller(_caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_group_id(&group_id)?;
    let records = state.listing.list(&group_id).await?;
    Ok(Json(records.as_ref().clone()))
}

/// Delete an object record and the stored object behind it
#[utoipa::path(
    delete,
    path = "/api/v0/records/{id}",
    tag = "records",
    params(("id" = Uuid, Path, description = "Object record ID")),
    responses(
        (status = 204, description = "Record and object deleted"),
        (status = 403, description = "Caller cannot write to the record's group", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller), fields(caller = %caller.label, record_id = %id))]
pub async fn delete_record(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.finalizer.delete(&caller, id).await?;
    tracing::info!(object_key = %record.object_key, "Object record deleted");
    Ok(StatusCode::NO_CONTENT)
}
