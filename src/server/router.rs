//! Router configuration for the booking API.

use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/properties/{id}/availability/",
            get(handlers::get_availability),
        )
        .route(
            "/properties/{id}/bookings/",
            get(handlers::list_property_bookings),
        )
        .route(
            "/bookings/",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/bookings/{id}/", get(handlers::get_booking))
        .route(
            "/bookings/{id}/status/",
            patch(handlers::update_booking_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
