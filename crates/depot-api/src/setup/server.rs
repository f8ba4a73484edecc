//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use depot_core::models::ResourceCategory;
use depot_core::Config;

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let rules = config.upload_rules();
    let catalog = if config.database_url().is_some() {
        "postgres"
    } else {
        "memory"
    };
    tracing::info!(
        storage_backend = %config.storage_backend(),
        catalog,
        max_image_mb = rules.ceiling(ResourceCategory::Image) / 1024 / 1024,
        max_video_mb = rules.ceiling(ResourceCategory::Video) / 1024 / 1024,
        max_archive_mb = rules.ceiling(ResourceCategory::Archive) / 1024 / 1024,
        upload_url_ttl_secs = config.upload_url_ttl_secs,
        download_url_ttl_secs = config.download_url_ttl_secs,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
///
/// # Panics
/// Panics if a signal handler cannot be installed (unrecoverable system error).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");

    crate::telemetry::shutdown_telemetry().await;
}
