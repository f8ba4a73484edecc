use crate::auth::AuthCaller;
use crate::constants::{ARCHIVE_FILE_FIELD, ARCHIVE_REPOSITORY_FIELD};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use depot_core::models::IngestSummary;
use depot_core::AppError;
use std::sync::Arc;

struct ArchiveUpload {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Ingest an archive: every entry becomes a repository file record
///
/// Individual entries that cannot be decoded or registered are reported in
/// `errors`; the request still succeeds.
#[utoipa::path(
    post,
    path = "/api/v0/archives/ingest",
    tag = "archives",
    request_body(content_type = "multipart/form-data", description = "`file`: the archive, `repositoryId`: target repository"),
    responses(
        (status = 200, description = "Archive ingested", body = IngestSummary),
        (status = 400, description = "Missing field or unreadable archive", body = ErrorResponse),
        (status = 403, description = "Caller cannot write to the repository", body = ErrorResponse),
        (status = 413, description = "Archive too large", body = ErrorResponse),
        (status = 415, description = "Unsupported archive format", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, caller, multipart), fields(caller = %caller.label))]
pub async fn ingest_archive(
    AuthCaller(caller): AuthCaller,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut repository_id: Option<String> = None;
    let mut upload: Option<ArchiveUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(ARCHIVE_REPOSITORY_FIELD) => {
                repository_id = Some(field.text().await?.trim().to_string());
            }
            Some(ARCHIVE_FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or("archive").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                upload = Some(ArchiveUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let repository_id = repository_id.ok_or_else(|| {
        AppError::Validation(format!("Missing '{}' field", ARCHIVE_REPOSITORY_FIELD))
    })?;
    let upload = upload
        .ok_or_else(|| AppError::Validation(format!("Missing '{}' field", ARCHIVE_FILE_FIELD)))?;

    let summary = state
        .archives
        .ingest(
            &caller,
            &repository_id,
            &upload.file_name,
            upload.content_type.as_deref(),
            upload.data,
        )
        .await?;

    tracing::info!(
        repository_id = %repository_id,
        success_count = summary.success_count,
        failed_count = summary.failed_count,
        "Archive ingested"
    );

    Ok(Json(summary))
}
