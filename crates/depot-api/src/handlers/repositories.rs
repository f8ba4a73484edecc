use crate::auth::AuthCaller;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use depot_core::models::RepositoryFile;
use depot_core::validation::validate_group_id;
use std::sync::Arc;

/// List the files registered in a repository by archive ingestion
#[utoipa::path(
    get,
    path = "/api/v0/repositories/{repository_id}/files",
    tag = "archives",
    params(("repository_id" = String, Path, description = "Repository identifier")),
    responses(
        (status = 200, description = "Files of the repository", body = Vec<RepositoryFile>),
        (status = 400, description = "Invalid repository id", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, _caller), fields(repository_id = %repository_id))]
pub async fn list_repository_files(
    AuthCaller(_caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    Path(repository_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_group_id(&repository_id)?;
    let files = state
        .listing
        .catalog()
        .list_repository_files(&repository_id)
        .await?;
    Ok(Json(files))
}
