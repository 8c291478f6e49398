use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use crate::error::ManagerError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Error returned by management API handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match &err {
            ManagerError::DuplicateSubscription(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_subscription", err.to_string())
            }
            ManagerError::UnknownSubscriptionType(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unknown_subscription_type",
                err.to_string(),
            ),
            ManagerError::InvalidSubscription(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_subscription", err.to_string())
            }
            ManagerError::SubscriptionNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            _ => {
                tracing::error!("Request failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
