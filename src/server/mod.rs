pub mod download;
pub mod files;
pub mod health;
pub mod wallpaper;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use download_portal_core::contract::Bucket;
use tokio::net::TcpListener;
use tracing::info;

use crate::wallpaper::WallpaperClient;

/// HTTP server state shared across all handlers. Built once at startup and
/// never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no storage is bound.
    pub storage: Option<Arc<dyn Bucket>>,
    pub wallpaper: WallpaperClient,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(storage: Option<Arc<dyn Bucket>>, wallpaper: WallpaperClient) -> Self {
        Self {
            storage,
            wallpaper,
            started_at: Instant::now(),
        }
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/files", get(files::files_handler))
        .route("/api/download", get(download::download_handler))
        .route("/api/bing", get(wallpaper::wallpaper_handler))
        .route("/health", get(health::health_handler))
        .with_state(state)
}

/// Serve on an already bound listener until the server stops.
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, "Starting HTTP server");
    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server error")?;
    Ok(())
}

/// Bind `bind` and serve.
pub async fn run_server(bind: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {bind}"))?;
    serve_on(listener, state).await
}
