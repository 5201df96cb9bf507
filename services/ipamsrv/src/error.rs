//! ipamsrv error type

use axum::response::{IntoResponse, Response};
use errors::{ErrorCategory, ServiceError};
use phpipam::PhpIpamError;
use thiserror::Error;
use tracing::{error, info, warn, Level};

pub type Result<T> = std::result::Result<T, IpamsrvError>;

#[derive(Debug, Error)]
pub enum IpamsrvError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A phpIPAM call that the operation could not do without
    #[error(transparent)]
    Upstream(#[from] PhpIpamError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IpamsrvError {
    pub fn connector_not_found(id: i64) -> Self {
        Self::NotFound(format!("IPAM integration {} not found", id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<common::ConfigLoadError> for IpamsrvError {
    fn from(err: common::ConfigLoadError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for IpamsrvError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl ServiceError for IpamsrvError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "DUPLICATE_INTEGRATION",
            Self::Upstream(inner) => inner.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Conflict(_) => ErrorCategory::Conflict,
            // phpIPAM failures surface as 502 whatever their cause
            Self::Upstream(_) => ErrorCategory::Upstream,
            Self::Database(_) => ErrorCategory::Database,
            Self::Serialization(_) | Self::Io(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for IpamsrvError {
    fn into_response(self) -> Response {
        let level = self.log_level();
        if level == Level::ERROR {
            error!(code = self.error_code(), "Request failed: {}", self);
        } else if level == Level::WARN {
            warn!(code = self.error_code(), "Request failed: {}", self);
        } else {
            info!(code = self.error_code(), "Request rejected: {}", self);
        }
        self.into_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_http_mapping() {
        assert_eq!(
            IpamsrvError::connector_not_found(7).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            IpamsrvError::validation("name is required").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IpamsrvError::Conflict("exists".into()).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            IpamsrvError::Internal("boom".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_every_upstream_failure_is_bad_gateway() {
        let failures = [
            PhpIpamError::Configuration("blank base URL".into()),
            PhpIpamError::Timeout {
                endpoint: "sections/".into(),
                timeout_ms: 7000,
            },
            PhpIpamError::Transport("connection refused".into()),
            PhpIpamError::remote(Some(500), "HTTP 500"),
        ];
        for failure in failures {
            let err = IpamsrvError::from(failure);
            assert_eq!(err.http_status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn test_upstream_keeps_client_code_and_message() {
        let err = IpamsrvError::from(PhpIpamError::remote(Some(401), "Invalid app code"));
        assert_eq!(err.error_code(), "PHPIPAM_REMOTE");
        assert_eq!(err.to_string(), "Invalid app code");
        assert!(!err.is_retryable());

        let err = IpamsrvError::from(PhpIpamError::Transport("reset".into()));
        assert!(err.is_retryable());
    }
}
