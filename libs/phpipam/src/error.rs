//! phpIPAM client error types

use errors::{ErrorCategory, ServiceError};
use thiserror::Error;

/// Result type for phpIPAM operations
pub type Result<T> = std::result::Result<T, PhpIpamError>;

/// Failures of a single phpIPAM API call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhpIpamError {
    /// Connector settings are unusable; raised before any network I/O
    #[error("phpIPAM configuration error: {0}")]
    Configuration(String),

    /// No complete response within the per-call timeout
    #[error("phpIPAM request to {endpoint} timed out after {timeout_ms} ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// The exchange could not be completed (DNS, TLS, connection reset, ...)
    #[error("phpIPAM transport error: {0}")]
    Transport(String),

    /// phpIPAM answered with an error status or `success: false`
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },
}

impl PhpIpamError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by phpIPAM, if the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl ServiceError for PhpIpamError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "PHPIPAM_CONFIGURATION",
            Self::Timeout { .. } => "PHPIPAM_TIMEOUT",
            Self::Transport(_) => "PHPIPAM_TRANSPORT",
            Self::Remote { .. } => "PHPIPAM_REMOTE",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Remote { .. } => ErrorCategory::Upstream,
        }
    }
}
