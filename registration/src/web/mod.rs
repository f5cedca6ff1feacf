//! HTTP front of the registration pipeline.
//!
//! A thin axum server that validates submissions and enqueues them. It
//! never touches the user store.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use handlers::{
    health, register_user, AppState, HealthResponse, RegisteredUser, RegistrationResponse,
    ACCEPTED_MESSAGE, INTERNAL_ERROR_MESSAGE,
};

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(register_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
