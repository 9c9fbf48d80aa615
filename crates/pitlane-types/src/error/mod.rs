//! Typed error taxonomy for Pitlane.
//!
//! A closed set of error kinds, each mapped to exactly one transport
//! status. All errors are designed to be:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display
//! - **Matchable** for handling logic via enum variants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed enumeration of failure kinds.
///
/// `status_code()` and `code()` are total functions: adding a variant
/// without extending them is a compile error, which keeps the
/// kind-to-status table in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    SessionExpired,
    Forbidden,
    RecordNotFound,
    MethodNotAllowed,
    ValidationError,
    InvalidInput,
    MissingRequiredField,
    DuplicateEntry,
    RateLimited,
    Timeout,
    ApiUnavailable,
    DatabaseError,
    ExternalApiError,
    AiError,
    ToolExecutionError,
    InternalServerError,
    NetworkError,
}

impl ErrorKind {
    /// HTTP status for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Unauthorized | Self::SessionExpired => 401,
            Self::Forbidden => 403,
            Self::RecordNotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::ValidationError | Self::InvalidInput | Self::MissingRequiredField => 400,
            Self::DuplicateEntry => 409,
            Self::RateLimited => 429,
            Self::Timeout => 408,
            Self::ApiUnavailable => 503,
            Self::DatabaseError
            | Self::ExternalApiError
            | Self::AiError
            | Self::ToolExecutionError
            | Self::InternalServerError
            | Self::NetworkError => 500,
        }
    }

    /// Wire code used in the error envelope.
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::DuplicateEntry => "DUPLICATE_ENTRY",
            Self::RateLimited => "RATE_LIMITED",
            Self::Timeout => "TIMEOUT",
            Self::ApiUnavailable => "API_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ExternalApiError => "EXTERNAL_API_ERROR",
            Self::AiError => "AI_ERROR",
            Self::ToolExecutionError => "TOOL_EXECUTION_ERROR",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
        }
    }

    /// Check if this is a client error (4xx).
    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Structured application error.
///
/// Immutable once constructed; created at the point of failure detection
/// and carried unmodified to the response boundary. Never persisted.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{}: {}", .kind.code(), .message)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
            user_id: None,
            trace_id: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_trace(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecordNotFound, message)
    }

    pub fn validation(field: &str, constraint: impl Into<String>) -> Self {
        let constraint = constraint.into();
        Self::new(ErrorKind::ValidationError, format!("{field}: {constraint}"))
            .with_details(serde_json::json!({ "field": field, "constraint": constraint }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    /// Classify an untyped failure by message content.
    ///
    /// Last-resort fallback, best-effort only. Lower layers raise typed
    /// errors directly wherever possible; this catches whatever escapes.
    pub fn from_unclassified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify_message(&message), message)
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

/// Substring heuristics for failures that reach the boundary untyped.
///
/// Code paths that can tell raise typed errors directly (a typed client
/// timeout is `Timeout`); this only catches what escapes as strings.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("relation") && lower.contains("does not exist") {
        ErrorKind::DatabaseError
    } else if lower.contains("duplicate key") || lower.contains("unique constraint") {
        ErrorKind::DuplicateEntry
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
    {
        ErrorKind::NetworkError
    } else {
        ErrorKind::InternalServerError
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidInput, format!("JSON error: {err}"))
    }
}

/// Standard Result type using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_fixed() {
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::SessionExpired.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::RecordNotFound.status_code(), 404);
        assert_eq!(ErrorKind::MethodNotAllowed.status_code(), 405);
        assert_eq!(ErrorKind::ValidationError.status_code(), 400);
        assert_eq!(ErrorKind::InvalidInput.status_code(), 400);
        assert_eq!(ErrorKind::MissingRequiredField.status_code(), 400);
        assert_eq!(ErrorKind::DuplicateEntry.status_code(), 409);
        assert_eq!(ErrorKind::RateLimited.status_code(), 429);
        assert_eq!(ErrorKind::Timeout.status_code(), 408);
        assert_eq!(ErrorKind::ApiUnavailable.status_code(), 503);
        assert_eq!(ErrorKind::DatabaseError.status_code(), 500);
        assert_eq!(ErrorKind::ExternalApiError.status_code(), 500);
        assert_eq!(ErrorKind::AiError.status_code(), 500);
        assert_eq!(ErrorKind::ToolExecutionError.status_code(), 500);
        assert_eq!(ErrorKind::InternalServerError.status_code(), 500);
        assert_eq!(ErrorKind::NetworkError.status_code(), 500);
    }

    #[test]
    fn test_classify_message() {
        assert_eq!(
            classify_message(r#"relation "chats" does not exist"#),
            ErrorKind::DatabaseError
        );
        assert_eq!(classify_message("operation timed out after 30s"), ErrorKind::NetworkError);
        assert_eq!(classify_message("connection refused (os error 111)"), ErrorKind::NetworkError);
        assert_eq!(classify_message("something exploded"), ErrorKind::InternalServerError);
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::new(ErrorKind::RecordNotFound, "chat missing")
            .with_trace("abc12345".to_string());

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("RECORD_NOT_FOUND"));
        assert!(json.contains("abc12345"));

        let deserialized: AppError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::validation("title", "must be 1..100 characters");
        let msg = format!("{}", err);
        assert!(msg.contains("VALIDATION_ERROR"));
        assert!(msg.contains("title"));
    }
}
