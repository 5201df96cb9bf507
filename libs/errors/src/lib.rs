//! Shared error taxonomy for the IPAM connector services
//!
//! Each crate keeps its own domain error enum and implements [`ServiceError`]
//! to get a common outward-facing interface: a stable error code, a category,
//! retry classification and the HTTP mapping used by the API layer.

use serde::{Deserialize, Serialize};

// ============================================================================
// ErrorBody - API error response type
// ============================================================================

/// JSON body returned by every failing API call: `{ "error": ..., "code": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    pub error: String,
    /// Stable machine readable code (e.g. `NOT_FOUND`)
    pub code: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

// ============================================================================
// ServiceError trait
// ============================================================================

/// Error category enum - used for classification and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    // Infrastructure layer
    Configuration,
    Database,
    Network,
    Timeout,

    // Business logic layer
    Validation,
    NotFound,
    Conflict,

    // A remote system answered, but with an error
    Upstream,

    // System level
    Internal,
}

/// Error capability trait
///
/// Defines a unified interface that service error types implement. A service
/// keeps its own domain-specific variants and gains the common behaviour
/// (codes, categories, HTTP responses) through this trait.
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    /// Get error code (for API, logs)
    fn error_code(&self) -> &'static str;

    /// Get error category
    fn category(&self) -> ErrorCategory;

    /// Whether the error is retryable (default implementation is category-based)
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout
        )
    }

    /// Convert to HTTP status code
    #[cfg(feature = "axum-support")]
    fn http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Upstream | ErrorCategory::Network | ErrorCategory::Timeout => {
                StatusCode::BAD_GATEWAY
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into an Axum HTTP response carrying an [`ErrorBody`]
    #[cfg(feature = "axum-support")]
    fn into_http_response(self) -> axum::response::Response
    where
        Self: Sized,
    {
        use axum::response::{IntoResponse, Json};

        (
            self.http_status(),
            Json(ErrorBody::new(self.to_string(), self.error_code())),
        )
            .into_response()
    }

    /// Get log level
    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Database | ErrorCategory::Configuration => {
                Level::ERROR
            },
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Upstream => {
                Level::WARN
            },
            ErrorCategory::Validation | ErrorCategory::NotFound | ErrorCategory::Conflict => {
                Level::INFO
            },
        }
    }
}

// Tests
#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum SampleError {
        #[error("missing: {0}")]
        Missing(String),
        #[error("remote timed out")]
        Slow,
        #[error("remote said no")]
        Rejected,
    }

    impl ServiceError for SampleError {
        fn error_code(&self) -> &'static str {
            match self {
                Self::Missing(_) => "NOT_FOUND",
                Self::Slow => "TIMEOUT",
                Self::Rejected => "REMOTE_ERROR",
            }
        }

        fn category(&self) -> ErrorCategory {
            match self {
                Self::Missing(_) => ErrorCategory::NotFound,
                Self::Slow => ErrorCategory::Timeout,
                Self::Rejected => ErrorCategory::Upstream,
            }
        }
    }

    #[test]
    fn test_default_retry_classification() {
        assert!(SampleError::Slow.is_retryable());
        assert!(!SampleError::Rejected.is_retryable());
        assert!(!SampleError::Missing("x".into()).is_retryable());
    }

    #[test]
    fn test_log_levels_follow_category() {
        assert_eq!(SampleError::Slow.log_level(), tracing::Level::WARN);
        assert_eq!(
            SampleError::Missing("x".into()).log_level(),
            tracing::Level::INFO
        );
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody::new("connector 3 not found", "NOT_FOUND");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "connector 3 not found");
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[cfg(feature = "axum-support")]
    #[test]
    fn test_http_status_mapping() {
        use axum::http::StatusCode;
        assert_eq!(
            SampleError::Missing("x".into()).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(SampleError::Rejected.http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(SampleError::Slow.http_status(), StatusCode::BAD_GATEWAY);

        let response = SampleError::Rejected.into_http_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
