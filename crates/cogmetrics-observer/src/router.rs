//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/records` -- `WebSocket` record stream
/// - `GET /api/status` -- run identity and progress
/// - `GET /api/history` -- recorded steps
/// - `GET /api/latest` -- most recent record
/// - `GET /api/series` -- one metric over time
/// - `GET /api/phase-space` -- logic vs aesthetic trajectory
/// - `GET /api/heatmap` -- token probability heatmap
/// - `GET /api/summary` -- per-metric statistics
/// - `GET /api/table` -- probability mass per token
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/records", get(ws::ws_records))
        .route("/api/status", get(handlers::get_status))
        .route("/api/history", get(handlers::get_history))
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/series", get(handlers::get_series))
        .route("/api/phase-space", get(handlers::get_phase_space))
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/table", get(handlers::get_table))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
