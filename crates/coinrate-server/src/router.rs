use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the API router. Requests running longer than `request_timeout` are
/// dropped, which cancels any in-flight store or source call.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let api_routes = Router::new()
        .route("/get_current_rate", get(handlers::get_current_rate))
        .route("/get_min_rate", get(handlers::get_min_rate))
        .route("/get_max_rate", get(handlers::get_max_rate))
        .route("/get_avg_rate", get(handlers::get_avg_rate))
        .route("/rates", get(handlers::get_rates));

    Router::new()
        .nest("/v1", api_routes)
        .route("/health", get(handlers::health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
