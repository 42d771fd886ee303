//! HTTP API for authbroker.
//!
//! Mounts all endpoint groups under /api/v1:
//! - /api/v1/apps   — app registration, status, authorization URLs
//! - /api/v1/tokens — provider callback, token fetch and refresh
//! - /api/v1/status — health check

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", routes::v1_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
