//! HTTP API: Axum router for cappers, picks, grading, leaderboards and
//! grading webhooks.
//!
//! Reads are public. Mutating capper/pick endpoints require the owner
//! bearer token; the webhook requires the shared `x-webhook-secret`.

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub use error::ApiError;
pub use routes::{ApiState, AppState};

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    info!(port, "API server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_allow_origin);

    Router::new()
        .route("/health", get(routes::health))
        // Cappers
        .route(
            "/api/cappers",
            get(routes::list_cappers).post(routes::create_capper),
        )
        .route(
            "/api/cappers/:id",
            get(routes::get_capper)
                .patch(routes::update_capper)
                .delete(routes::delete_capper),
        )
        // Picks
        .route("/api/picks", get(routes::list_picks).post(routes::create_pick))
        .route(
            "/api/picks/:id",
            get(routes::get_pick).patch(routes::update_pick),
        )
        .route("/api/picks/:id/grade", post(routes::grade_pick))
        .route("/api/picks/:id/grades", get(routes::grade_history))
        // Leaderboards and webhooks
        .route("/api/leaderboards", get(routes::get_leaderboard))
        .route("/api/webhooks/grade", post(routes::webhook_grade))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(routes::WEBHOOK_SECRET_HEADER),
        ]);

    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin, "Invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
