//! Error types used throughout the fetch engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification used for logging and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Token issuance failed or the API rejected the credential (401/403)
    Authentication,
    /// Too many requests (429)
    RateLimit,
    /// Server-side failure (5xx)
    Server,
    /// Client-side failure (4xx other than auth and rate limit)
    Client,
    /// Connection, timeout or transport failure
    Network,
    /// Configuration, parsing or internal failure
    Config,
}

/// Main error type for FhirPull
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum FhirPullError {
    /// Token issuance failed. Fatal for the current operation.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A retriable failure (429, 5xx or read timeout) that survived every
    /// attempt of the retry policy.
    #[error("Transient failure after {attempts} attempt(s): {message}")]
    Transient { status: Option<u16>, attempts: u32, message: String },

    /// Non-retriable HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FhirPullError {
    /// HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            _ => None,
        }
    }

    /// The API rejected the bearer credential
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// The addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || self.status() == Some(404)
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Http { status: 401 | 403, .. } => ErrorCategory::Authentication,
            Self::Http { status: 429, .. } | Self::Transient { status: Some(429), .. } => {
                ErrorCategory::RateLimit
            }
            Self::Http { status, .. } if *status >= 500 => ErrorCategory::Server,
            Self::Transient { status: Some(_), .. } => ErrorCategory::Server,
            Self::Http { .. } | Self::NotFound(_) => ErrorCategory::Client,
            Self::Transient { status: None, .. } | Self::Network(_) | Self::Io(_) => {
                ErrorCategory::Network
            }
            Self::InvalidResponse(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorCategory::Config
            }
        }
    }

    /// Stable label suitable for structured log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Transient { .. } => "transient",
            Self::Http { .. } => "http",
            Self::Network(_) => "network",
            Self::InvalidResponse(_) => "invalid_response",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for FhirPull operations
pub type Result<T> = std::result::Result<T, FhirPullError>;
