//! Liveness server: Axum endpoints for an external process supervisor.
//!
//! Runs on the main task alongside the background scheduler; the two share
//! no state.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Build the Axum router with all routes and middleware.
pub fn build_router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .layer(cors)
}

/// Bind `host:port` and serve until `shutdown` resolves.
pub async fn serve<F>(host: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind liveness address {host}:{port}"))?;
    let addr = listener
        .local_addr()
        .context("Liveness listener has no local address")?;
    info!(%addr, "Liveness server listening");

    axum::serve(listener, build_router())
        .with_graceful_shutdown(shutdown)
        .await
        .context("Liveness server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
