//! skillshare-server - the localhost HTTP control plane.
//!
//! A JSON API over localhost that fronts the engine. One process-wide mutex
//! serializes every mutating request; read-only requests run concurrently
//! and see eventually consistent state. Each mutating request emits exactly
//! one structured operations-log entry (command, status, duration,
//! arguments) and invalidates the discovery cache for the active source
//! root before the lock is released.

pub mod error;
pub mod oplog;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

pub use state::{AppState, SharedState};

/// Builds the API router over shared state.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/overview", get(routes::health::overview))
        .route("/api/skills", get(routes::skills::list))
        .route("/api/skills/{name}", get(routes::skills::detail))
        .route(
            "/api/targets",
            get(routes::targets::list).post(routes::targets::create),
        )
        .route(
            "/api/targets/{name}",
            delete(routes::targets::remove).patch(routes::targets::update),
        )
        .route("/api/sync", post(routes::sync::sync))
        .route("/api/diff", get(routes::sync::diff))
        .route("/api/status", get(routes::sync::status))
        .route("/api/collect/scan", get(routes::collect::scan))
        .route("/api/collect", post(routes::collect::apply))
        .route("/api/backups", get(routes::backup::list))
        .route("/api/backup", post(routes::backup::create))
        .route("/api/restore", post(routes::backup::restore))
        .route("/api/backup/cleanup", post(routes::backup::cleanup))
        .route(
            "/api/config",
            get(routes::config::read).put(routes::config::write),
        )
        .route("/api/cache", get(routes::cache::info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the control plane on localhost and serves until shutdown.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control plane listening");
    axum::serve(listener, router(Arc::new(state))).await
}
