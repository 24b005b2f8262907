//! webcache server - serves one expiring cache over HTTP
//!
//! Opens the configured backing store, wraps it in a cache and exposes the
//! cache operations as a JSON API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webcache::api::{create_router, AppState};
use webcache::{spawn_sweep_task, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the backing store and build the cache
/// 4. Start the background expiry sweep, unless disabled
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting webcache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: storage={}, path={}, default_exp={:?}, crypt={}",
        config.storage,
        config.storage_path.display(),
        config.default_exp,
        config.crypt
    );
    info!(
        "Server settings: port={}, sweep_interval={}s",
        config.server_port, config.sweep_interval
    );

    let state = AppState::from_config(&config).context("invalid cache configuration")?;
    {
        let cache = state.cache.read().await;
        if !cache.is_supported() {
            warn!("Backing store is not usable, all cache operations are no-ops");
        }
        info!("Cache initialized with {} stored slots", cache.len());
    }

    let sweep_handle = if config.sweep_interval > 0 {
        Some(spawn_sweep_task(state.cache.clone(), config.sweep_interval))
    } else {
        info!("Expiry sweep disabled, entries expire lazily on read");
        None
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Sweep task aborted");
    }
}
