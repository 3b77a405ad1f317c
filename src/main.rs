//! StreamTube - music search front end with a durable result cache

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamtube::api::{create_router, AppState};
use streamtube::cache::FileStore;
use streamtube::config::Config;
use streamtube::search::{InvidiousProvider, SearchService, StreamUrlBuilder};
use streamtube::tasks::spawn_sweep_task;

/// Main entry point for the StreamTube server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file-backed cache store
/// 4. Start background sweep task
/// 5. Wire the search service and Axum router
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamtube=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StreamTube");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_dir={}, default_ttl={}s, max_entries={:?}, sweep_interval={}s, port={}",
        config.cache_dir.display(),
        config.default_ttl,
        config.max_entries,
        config.sweep_interval,
        config.server_port
    );

    let cache = Arc::new(
        FileStore::open(config.store_config())
            .await
            .with_context(|| format!("opening cache at {}", config.cache_dir.display()))?,
    );
    info!("Cache store ready with {} live entries", cache.len().await.unwrap_or(0));

    let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);

    let provider = InvidiousProvider::new(config.search_api_base.clone())
        .context("building search provider")?;
    let urls = StreamUrlBuilder::new(config.stream_api_base.clone(), config.stream_api_key.clone());
    let search = SearchService::new(cache.clone(), Arc::new(provider), urls, config.max_results);

    let app = create_router(AppState::new(cache, search));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");
}
