use crate::config::ServerConfig;
use crate::signaling::{SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve_on(listener, SignalingService::new(), std::future::pending()).await
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    service: SignalingService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    info!("Signaling server listening on ws://{}/ws", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Signaling server failed")
}
