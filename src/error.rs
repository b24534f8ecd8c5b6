//! Error types for rgmgmt.
//!
//! Every fallible operation in the library returns [`Result`]. The variants
//! keep enough of the Resource Manager response (status, error code, message)
//! to tell which call failed and why.

use thiserror::Error;

/// Result type alias for rgmgmt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for rgmgmt.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// One or more required environment variables are unset or empty.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),

    /// Invalid configuration value or unreadable configuration file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// The token endpoint rejected the client credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    // ========================================================================
    // Management API Errors
    // ========================================================================
    /// The management API answered with a non-success status.
    #[error("{operation} failed ({status}): {code}: {message}")]
    Api {
        /// The operation that was attempted
        operation: String,
        /// HTTP status code
        status: u16,
        /// ARM error code, or the status reason when the body had none
        code: String,
        /// ARM error message, or the raw body
        message: String,
    },

    /// A long-running operation finished in a non-successful state.
    #[error("{operation} ended in state '{status}'")]
    OperationFailed {
        /// The operation that was attempted
        operation: String,
        /// Terminal status reported by the service
        status: String,
    },

    /// The response did not have the expected shape.
    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse {
        /// The operation that was attempted
        operation: String,
        /// What was wrong with the response
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new API error.
    pub fn api(
        operation: impl Into<String>,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected response error.
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication(_)) || self.status_code() == Some(401)
    }
}
