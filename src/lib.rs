pub mod api;
pub mod config;
pub mod extractor;
pub mod links;
pub mod models;
pub mod normalizer;
pub mod process;
pub mod resolver;
pub mod tools;

use std::sync::Arc;

pub use api::{create_router, AppState};
pub use config::{AppConfig, ConfigError};
pub use extractor::{ExtractionError, FailureReason, MetadataSource, YtDlpExtractor};
pub use models::{PlaylistKind, PlaylistResult, VideoRecord};
pub use resolver::{PlaylistResolver, ResolutionError, ResolverConfig};

pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let source: Arc<dyn MetadataSource> = Arc::new(YtDlpExtractor::new(config.extractor.clone()));

    tracing::info!(
        source = source.name(),
        available = source.is_available(),
        max_playlist_size = config.resolver.max_playlist_size,
        chunk_size = config.resolver.chunk_size,
        "Starting playlist resolver"
    );

    let state = AppState::new(source, config.resolver.clone());
    let app = create_router(state, &config.cors_origins, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
