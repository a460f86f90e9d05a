//! Error types for Shanty

use std::io;
use thiserror::Error;

/// Result type for Shanty operations
pub type Result<T> = std::result::Result<T, ShantyError>;

/// Errors that can occur in Shanty
#[derive(Debug, Error)]
pub enum ShantyError {
    /// I/O error, surfaced with its native meaning
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Invalid setup: filters, redaction patterns, mutually exclusive modes
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Replay was required but no fixture exists for the request
    #[error("Unknown request {method} to {url}")]
    UnknownRequest {
        /// Upper-cased request method
        method: String,
        /// Absolute request URL
        url: String,
    },

    /// URL could not be parsed or lacks a host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Fixture document could not be decoded
    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    /// Live call failed in the bundled transport
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ShantyError {
    /// Build an `UnknownRequest` error for the given method and URL
    pub fn unknown_request(method: &str, url: &str) -> Self {
        Self::UnknownRequest {
            method: method.to_uppercase(),
            url: url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_request_names_method_and_url() {
        let err = ShantyError::unknown_request("get", "https://example.com/hello");
        assert_eq!(
            err.to_string(),
            "Unknown request GET to https://example.com/hello"
        );
    }

    #[test]
    fn test_io_error_keeps_kind() {
        let err: ShantyError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        match err {
            ShantyError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("unexpected error: {other}"),
        }
    }
}
