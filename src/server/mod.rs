//! HTTP API: axum front door for the session registry.
//!
//! Any presentation layer (the browser widget, a bot, a CLI) drives
//! sessions through these JSON endpoints. CORS is open so a locally
//! served front end can call it during development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use routes::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/sessions/:wallet",
            get(routes::get_session)
                .post(routes::open_session)
                .delete(routes::delete_session),
        )
        .route("/api/sessions/:wallet/mode", post(routes::set_mode))
        .route("/api/sessions/:wallet/mode/toggle", post(routes::toggle_mode))
        .route("/api/sessions/:wallet/stake", post(routes::select_stake))
        .route("/api/sessions/:wallet/side", post(routes::select_side))
        .route("/api/sessions/:wallet/flip", post(routes::flip))
        .route("/api/sessions/:wallet/top-up", post(routes::top_up))
        .route("/api/sessions/:wallet/reset", post(routes::reset))
        .route("/api/sessions/:wallet/history", get(routes::get_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API address {addr}"))?;

    info!(%addr, "API server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
