//! [apps/server/src/middleware.rs]
//! Cross-cutting HTTP layer: permissive CORS. There is no admin/auth
//! surface in this core, so the only perimeter concern here is letting
//! dashboards on a different origin reach the query endpoint.

use axum::http::{header, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
