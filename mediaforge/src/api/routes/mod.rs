//! API route modules.
//!
//! Organizes routes by resource type.

pub mod health;
pub mod logging;
pub mod media;
pub mod tools;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/media", media::router().merge(tools::router()))
        .nest("/api/logging", logging::router())
        .nest("/health", health::router())
        .with_state(state)
}
