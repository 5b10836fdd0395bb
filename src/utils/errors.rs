//! Manejo de errores
//!
//! Todo fallo del servicio termina en [`AppError`], que además sabe
//! convertirse en una respuesta HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The submitted reading is not strictly greater than the vehicle's odometer.
    #[error("Mileage must be greater than current value ({current}); got {submitted}")]
    InvalidMileage { current: i64, submitted: i64 },

    /// Same reading already logged inside the debounce window.
    #[error("Mileage {mileage} was already recorded at {recorded_at}")]
    DuplicateSubmission {
        mileage: i64,
        recorded_at: DateTime<Utc>,
    },

    /// The vehicle row changed between read and commit.
    #[error("Vehicle {0} was modified concurrently")]
    StaleVehicle(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("External API error: {0}")]
    ExternalApi(String),
}

impl AppError {
    /// Whether the failure may be retried at the transaction boundary.
    ///
    /// Validation outcomes are deterministic and never retried; only stale
    /// commits and transient storage failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::StaleVehicle(_) => true,
            AppError::Database(sqlx::Error::PoolTimedOut) | AppError::Database(sqlx::Error::Io(_)) => true,
            AppError::Database(sqlx::Error::Database(db)) => {
                // serialization_failure / deadlock_detected
                matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

/// Cuerpo de error de la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "An error occurred while accessing the database".to_string(),
                        "DB_ERROR",
                    ),
                )
            }

            AppError::Validation(e) => {
                tracing::debug!("Validation error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "Validation Error",
                        "The provided data is invalid".to_string(),
                        "VALIDATION_ERROR",
                    )
                    .with_details(json!(e)),
                )
            }

            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
                )
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden access: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse::new("Forbidden", msg, "FORBIDDEN"),
                )
            }

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            ),

            AppError::InvalidMileage { current, submitted } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(
                    "Invalid Mileage",
                    format!(
                        "Mileage must be greater than current value ({}). Mileage rollback is not permitted.",
                        current
                    ),
                    "INVALID_MILEAGE",
                )
                .with_details(json!({ "current_mileage": current, "submitted_mileage": submitted })),
            ),

            AppError::DuplicateSubmission { mileage, recorded_at } => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "Duplicate Submission",
                    format!("Mileage {} has already been logged", mileage),
                    "DUPLICATE_SUBMISSION",
                )
                .with_details(json!({ "mileage": mileage, "recorded_at": recorded_at })),
            ),

            AppError::StaleVehicle(id) => {
                tracing::warn!("Giving up on concurrently modified vehicle {}", id);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "Conflict",
                        "The vehicle was updated concurrently, please retry".to_string(),
                        "CONCURRENT_UPDATE",
                    ),
                )
            }

            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Conflict", msg, "CONFLICT"),
            ),

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "INTERNAL_ERROR",
                    ),
                )
            }

            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "Rate Limit Exceeded",
                    "Too many requests. Please try again later".to_string(),
                    "RATE_LIMIT_EXCEEDED",
                ),
            ),

            AppError::Jwt(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("JWT Error", msg, "JWT_ERROR"),
            ),

            AppError::ExternalApi(msg) => {
                tracing::error!("External API error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new(
                        "External API Error",
                        "An error occurred while communicating with external service".to_string(),
                        "EXTERNAL_API_ERROR",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Helper para recursos inexistentes
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Helper para violaciones de unicidad
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Helper para operaciones denegadas
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_mileage_maps_to_422() {
        let response = AppError::InvalidMileage { current: 500, submitted: 400 }.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_duplicate_is_distinct_from_invalid() {
        let response = AppError::DuplicateSubmission {
            mileage: 500,
            recorded_at: Utc::now(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_malformed_input_maps_to_validation_400() {
        let response = AppError::from(validator::ValidationErrors::new()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(AppError::StaleVehicle(Uuid::new_v4()).is_retryable());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!AppError::InvalidMileage { current: 1, submitted: 1 }.is_retryable());
        assert!(!AppError::NotFound("x".to_string()).is_retryable());
    }
}
