//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::repositories::RepositoryError;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Storage Errors**: anything the repositories fail with
/// - **Authentication Errors**: invalid or missing API keys, non-staff callers
/// - **Resource Errors**: unknown transaction reference, account without a balance
/// - **Business Rule Errors**: validating a transaction twice
/// - **Validation Errors**: malformed request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage operation failed. Details are logged, not returned.
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Caller is authenticated but not allowed to use this endpoint.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// No transaction with the requested reference.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// The caller has no balance to open a transaction against.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Balance not found")]
    BalanceNotFound,

    /// The transaction is already active; it was credited before.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Transaction has already been validated.")]
    AlreadyValidated,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::TransactionNotFound => (StatusCode::NOT_FOUND, "transaction_not_found"),
            AppError::BalanceNotFound => (StatusCode::NOT_FOUND, "balance_not_found"),
            AppError::AlreadyValidated => {
                (StatusCode::BAD_REQUEST, "transaction_validated_already")
            }
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Malformed JSON bodies become `InvalidRequest` so every client error
/// shares the same envelope.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            AppError::InvalidRequest(msg) => msg,
            AppError::Storage(ref err) => {
                // Hide storage details from the client
                tracing::error!(error = %err, "Storage failure while handling request");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
