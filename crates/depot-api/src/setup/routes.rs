//! Route configuration and setup

use crate::auth::auth_middleware;
use crate::constants::{API_PREFIX, OPENAPI_PATH};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use depot_core::config::WILDCARD_SCOPE;
use depot_core::models::ResourceCategory;
use depot_core::Config;
use depot_storage::local::OBJECTS_ROUTE;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Headroom above the largest category ceiling for multipart framing.
const BODY_LIMIT_SLACK_BYTES: u64 = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let body_limit = max_body_bytes(config);
    tracing::info!(body_limit_bytes = body_limit, "Request body limit configured");

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(http_concurrency_limit, "HTTP concurrency limit layer enabled");

    let app = public_routes()
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn max_body_bytes(config: &Config) -> usize {
    let rules = config.upload_rules();
    let largest = ResourceCategory::ALL
        .iter()
        .map(|category| rules.ceiling(*category))
        .max()
        .unwrap_or(0);
    usize::try_from(largest.saturating_add(BODY_LIMIT_SLACK_BYTES)).unwrap_or(usize::MAX)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == WILDCARD_SCOPE) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no bearer authentication)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            OPENAPI_PATH,
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .route(
            &format!("{}/{{*key}}", OBJECTS_ROUTE),
            get(handlers::objects::get_object).put(handlers::objects::put_object),
        )
}

/// Protected routes (require a bearer token when tokens are configured)
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(upload_routes())
        .merge(url_routes())
        .merge(record_routes())
        .merge(archive_routes())
}

fn upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/uploads/presigned", API_PREFIX),
            post(handlers::uploads::issue_presigned_url),
        )
        .route(
            &format!("{}/uploads/finalize", API_PREFIX),
            post(handlers::uploads::finalize_upload),
        )
}

fn url_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/urls/signed", API_PREFIX),
            post(handlers::urls::get_signed_url),
        )
        .route(
            &format!("{}/urls/signed/batch", API_PREFIX),
            post(handlers::urls::get_signed_urls_batch),
        )
}

fn record_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/groups/{{group_id}}/records", API_PREFIX),
            get(handlers::records::list_group_records),
        )
        .route(
            &format!("{}/records/{{id}}", API_PREFIX),
            delete(handlers::records::delete_record),
        )
}

fn archive_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/archives/ingest", API_PREFIX),
            post(handlers::archives::ingest_archive),
        )
        .route(
            &format!("{}/repositories/{{repository_id}}/files", API_PREFIX),
            get(handlers::repositories::list_repository_files),
        )
}
