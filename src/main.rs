//! Shortstash server entry point.
//!
//! Serves the public and admin routers on separate ports over one shared,
//! decorated backend.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shortstash::api::{admin_router, public_router, AppState, ClientRateLimiter};
use shortstash::backend::new_base_backend;
use shortstash::decorators::decorate;
use shortstash::metrics::Metrics;
use shortstash::tasks::{spawn_rate_limit_sweep, SWEEP_INTERVAL};
use shortstash::{version, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the base backend and wrap it in the decorator chain
/// 4. Start the rate limiter sweep when limiting is enabled
/// 5. Serve the public and admin routers
/// 6. Stop both listeners on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortstash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting shortstash {} ({})",
        version::VERSION,
        version::revision()
    );

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            return Err(err.into());
        }
    };
    config.log_summary();

    let metrics = Arc::new(Metrics::new());
    let base = new_base_backend(&config.backend)
        .await
        .context("failed to create backend")?;
    let backend = decorate(&config, metrics.clone(), base);

    let limiter = ClientRateLimiter::from_config(&config.rate_limiter, Some(metrics.clone()));
    let sweep_handle = limiter
        .clone()
        .map(|limiter| spawn_rate_limit_sweep(limiter, SWEEP_INTERVAL));
    if limiter.is_none() {
        warn!("Rate limiting disabled on the public port");
    }

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), backend, metrics);
    let public = public_router(state.clone(), limiter);
    let admin = admin_router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = tokio::spawn(serve("public", config.port, public, shutdown_rx.clone()));
    let admin_server = tokio::spawn(serve("admin", config.admin_port, admin, shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Rate limiter sweep task aborted");
    }

    public_server.await.context("public server task panicked")??;
    admin_server.await.context("admin server task panicked")??;

    info!("Server shutdown complete");
    Ok(())
}

/// Binds `port` on all interfaces and serves `router` until shutdown is signalled.
async fn serve(
    name: &'static str,
    port: u16,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {} port {}", name, port))?;
    info!("{} server listening on http://{}", name, addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.wait_for(|stop| *stop).await;
    })
    .await
    .with_context(|| format!("{} server failed", name))?;

    info!("{} server stopped", name);
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
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
                error!("Failed to install SIGTERM handler: {}", err);
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
}
