//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use depot_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let catalog = depot_db::create_catalog(&config)
        .await
        .context("Failed to initialize catalog")?;

    let storage = depot_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let access = depot_services::create_access_policy(&config);

    let state = Arc::new(AppState::new(config.clone(), storage, catalog, access));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
