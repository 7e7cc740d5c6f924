//! Error types for Aqar services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Localized user-facing failure messages

use crate::search::Language;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    SearchTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::RateLimited => 6001,
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::UpstreamError => 8001,
            ErrorCode::SearchTimeout => 8002,
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Completion service error ({provider}): {message}")]
    Completion { provider: String, message: String },

    #[error("Search timed out after {timeout_ms}ms")]
    SearchTimeout { timeout_ms: u64 },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Shorthand for a completion failure
    pub fn completion(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Completion {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Completion { .. } => ErrorCode::UpstreamError,
            AppError::SearchTimeout { .. } => ErrorCode::SearchTimeout,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Completion { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::Database(_) | AppError::DatabaseConnection { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 504 Gateway Timeout
            AppError::SearchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Whether the failure came from the store, the completion service,
    /// or the pipeline deadline
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::DatabaseConnection { .. }
                | AppError::Completion { .. }
                | AppError::SearchTimeout { .. }
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to show an end user in the requested language.
    ///
    /// Client errors keep their own text; every server-side failure collapses
    /// to one generic sentence so raw upstream details never reach the UI.
    pub fn localized_message(&self, language: Language) -> String {
        if self.is_client_error() {
            return self.to_string();
        }
        match language {
            Language::En => "Sorry, something went wrong while searching. Please try again.".to_string(),
            Language::Ar => "عذراً، حدث خطأ أثناء البحث. يرجى المحاولة مرة أخرى.".to_string(),
        }
    }

    /// Render this error as a response carrying the localized message
    pub fn into_localized_response(self, language: Language) -> Response {
        let message = self.localized_message(language);
        self.respond(message)
    }

    fn respond(self, message: String) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.localized_message(Language::default());
        self.respond(message)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::completion("http", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::completion("openai", "quota exceeded");
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_upstream());
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "query must not be empty".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert!(!err.is_upstream());
    }

    #[test]
    fn test_database_error_is_upstream() {
        let err = AppError::Database(sea_orm::DbErr::Custom("connection reset".into()));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert!(err.is_upstream());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_timeout_code() {
        let err = AppError::SearchTimeout { timeout_ms: 1500 };
        assert_eq!(err.code(), ErrorCode::SearchTimeout);
        assert_eq!(err.code().as_code(), 8002);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_localized_message_hides_upstream_details() {
        let err = AppError::completion("anthropic", "401 invalid x-api-key");

        let en = err.localized_message(Language::En);
        let ar = err.localized_message(Language::Ar);

        assert!(!en.contains("x-api-key"));
        assert!(!ar.contains("x-api-key"));
        assert_ne!(en, ar);
        assert!(ar.contains("البحث"));
    }

    #[test]
    fn test_localized_message_keeps_validation_text() {
        let err = AppError::Validation {
            message: "query must not be empty".into(),
            field: None,
        };
        assert!(err.localized_message(Language::Ar).contains("query must not be empty"));
    }
}
