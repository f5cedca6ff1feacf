//! Registration endpoint handlers.
//!
//! The registration handler only:
//! 1. Validates the submission
//! 2. Enqueues it to RabbitMQ
//! 3. Responds once the publish has resolved
//!
//! Persistence and the welcome email happen in the worker.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::queue::UserPublisher;
use crate::user::validate_user;

/// Message returned with `202 Accepted`.
pub const ACCEPTED_MESSAGE: &str = "User received and sent for processing.";

/// Message returned with `500 Internal Server Error`.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error while processing your request.";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn UserPublisher>,
}

impl AppState {
    pub fn new(publisher: impl UserPublisher + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Identity echoed back on acceptance. The phone number is never echoed.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub name: String,
    pub email: String,
}

/// Registration response body.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RegisteredUser>,
}

impl RegistrationResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// `POST /api/users`.
///
/// Responds `400` with the first validation error, `202` once the payload
/// is on the queue, or `500` if publishing fails.
pub async fn register_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "registration_body_rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(RegistrationResponse::error(rejection.body_text())),
            );
        }
    };

    let user = match validate_user(&raw) {
        Ok(user) => user,
        Err(e) => {
            warn!(field = %e.field(), error = %e, "registration_validation_failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(RegistrationResponse::error(e.to_string())),
            );
        }
    };

    if let Err(e) = state.publisher.publish_user(&user).await {
        error!(email = %user.email, error = %e, "registration_publish_failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RegistrationResponse::error(INTERNAL_ERROR_MESSAGE)),
        );
    }

    info!(email = %user.email, "registration_enqueued");

    (
        StatusCode::ACCEPTED,
        Json(RegistrationResponse {
            message: ACCEPTED_MESSAGE.to_string(),
            data: Some(RegisteredUser {
                name: user.name,
                email: user.email,
            }),
        }),
    )
}
