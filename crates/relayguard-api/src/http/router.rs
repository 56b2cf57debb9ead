//! Axum router configuration with middleware.
//!
//! `POST /webhook` is the inbound update endpoint; the ops surface lives
//! under `/api/v1/`. Middleware: request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::ServeState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: ServeState) -> Router {
    let api_routes = Router::new()
        .route("/stats", get(handlers::status::get_stats))
        .route("/connections", get(handlers::status::list_connections));

    Router::new()
        .route("/webhook", post(handlers::webhook::receive_update))
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
