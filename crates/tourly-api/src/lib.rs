//! Tourly API: HTTP surface for booking quotes and overdue order monitoring.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

/// Builds the application router with every context mounted.
pub fn app(app_state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/bookings", routes::bookings::router())
        .nest("/api/v1/orders", routes::orders::router())
        .with_state(app_state)
}
