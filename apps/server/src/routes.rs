//! [apps/server/src/routes.rs]
//! Router wiring: probe socket upgrade, the read-only query endpoint, and
//! a liveness check, behind CORS and request tracing.

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{query, ws};
use crate::middleware::cors_layer;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/probes/stream", get(ws::upgrade))
        .route("/api/v1/query", get(query::query))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
