//! HTTP proxy exposing the NASA POWER series as flat JSON records for browser clients.

pub mod app_state;
pub mod handlers;

use crate::proxy::app_state::AppState;
use crate::proxy::handlers::{health_check, nasa_datos};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Any origin, method and header is allowed.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/nasa-datos", get(nasa_datos))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
