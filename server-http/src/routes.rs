use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Usage page
        .route("/", get(handlers::index))
        // Health check
        .route("/health", get(handlers::health_check))
        // SSE Events endpoint
        .route("/events", get(handlers::stream_events))
        // Seat routes
        .route(
            "/{bus_id}",
            get(handlers::get_free_seats).post(handlers::sell_ticket),
        )
        // Middleware
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
