//! OpenAPI documentation, served at [`crate::constants::OPENAPI_PATH`].

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use depot_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Depot API",
        version = "0.1.0",
        description = "Object ingestion API (v0). Clients request presigned URLs, upload bytes directly to object storage, then finalize an object record. Archives are ingested server-side into repository file records."
    ),
    paths(
        // Uploads
        handlers::uploads::issue_presigned_url,
        handlers::uploads::finalize_upload,
        // Signed URLs
        handlers::urls::get_signed_url,
        handlers::urls::get_signed_urls_batch,
        // Records
        handlers::records::list_group_records,
        handlers::records::delete_record,
        // Archives
        handlers::archives::ingest_archive,
        handlers::repositories::list_repository_files,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        models::IssuePutRequest,
        models::IssuePutResponse,
        models::FinalizeRequest,
        models::ObjectRecord,
        models::SignedUrlRequest,
        models::SignedUrlResponse,
        models::BatchSignedUrlRequest,
        models::BatchSignedUrlResponse,
        models::IngestSummary,
        models::IngestFailure,
        models::RepositoryFile,
        models::EntryCategory,
        models::ResourceCategory,
        error::ErrorResponse,
        handlers::health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "uploads", description = "Presigned upload issuance and finalization"),
        (name = "urls", description = "Signed download URLs"),
        (name = "records", description = "Object record listing and cleanup"),
        (name = "archives", description = "Archive ingestion and repository files"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_routes() {
        let spec = get_openapi_spec();
        for path in [
            "/api/v0/uploads/presigned",
            "/api/v0/uploads/finalize",
            "/api/v0/urls/signed/batch",
            "/api/v0/archives/ingest",
            "/api/v0/groups/{group_id}/records",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(spec
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
