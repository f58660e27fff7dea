//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain_billing::BillingError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// True when retrying the same request may succeed
    pub retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, retryable, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", false, msg.clone()),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", false, msg.clone())
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", true, msg.clone()),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                true,
                msg.clone(),
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                false,
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(error: BillingError) -> Self {
        match &error {
            BillingError::CustomerNotFound(_) | BillingError::BillNotFound(_) => {
                ApiError::NotFound(error.to_string())
            }
            BillingError::InvalidReading { .. }
            | BillingError::InvalidAmount(_)
            | BillingError::Overpayment { .. } => ApiError::Validation(error.to_string()),
            BillingError::ConcurrentSubmission(_) => ApiError::Conflict(error.to_string()),
            BillingError::Calculation(_) | BillingError::Storage(_) => {
                ApiError::Internal(error.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}
