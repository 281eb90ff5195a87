//! Error types for Solr operations.

use std::time::Duration;
use thiserror::Error;

/// Solr error type.
#[derive(Error, Debug)]
pub enum SolrError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Error reported by the Solr server.
    #[error("Solr error ({status}): {message}")]
    Solr {
        /// HTTP status code (or the `error.code` field of the body).
        status: u16,
        /// Server-side message.
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Named query could not be resolved or bound.
    #[error("Named query error: {0}")]
    NamedQuery(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request failed after all retries were used.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SolrError {
    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Solr { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get the HTTP status code if this is a server error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Solr { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for Solr operations.
pub type Result<T> = std::result::Result<T, SolrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        let err = SolrError::Solr {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(503));

        let err = SolrError::Solr {
            status: 400,
            message: "undefined field".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SolrError::NamedQuery("Product.findByName".to_string());
        assert!(err.to_string().contains("Product.findByName"));
        assert!(SolrError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!SolrError::Validation("empty".to_string()).is_retryable());
    }
}
