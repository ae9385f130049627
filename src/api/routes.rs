use super::{handlers, ApiState};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/monitor/status", get(handlers::get_monitor_status))
        .route("/api/monitor/groups", get(handlers::get_monitor_groups))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
