//! Error types for BarberFlow server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned alongside every error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    InvalidRange = 6,
    InvalidRule = 7,
    InvalidAppointment = 8,
    SlotUnavailable = 9,
    RuleConflict = 10,
    InvalidTransition = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Invalid schedule rule: {0}")]
    InvalidRule(String),

    #[error("Invalid appointment: {0}")]
    InvalidAppointment(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Schedule rule conflict: {0}")]
    RuleConflict(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Numeric code and HTTP status for this error kind
    pub fn code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::InvalidRange(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidRange),
            AppError::InvalidRule(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidRule),
            AppError::InvalidAppointment(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidAppointment)
            }
            AppError::SlotUnavailable(_) => (StatusCode::CONFLICT, ErrorCode::SlotUnavailable),
            AppError::RuleConflict(_) => (StatusCode::CONFLICT, ErrorCode::RuleConflict),
            AppError::InvalidTransition(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InvalidTransition)
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::InvalidRange(msg)
            | AppError::InvalidRule(msg)
            | AppError::InvalidAppointment(msg)
            | AppError::SlotUnavailable(msg)
            | AppError::RuleConflict(msg)
            | AppError::InvalidTransition(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::BadRequest(msg) => msg.clone(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
