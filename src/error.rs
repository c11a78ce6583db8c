//! Error types for Crossbeat
//!
//! Defines the error type shared by configuration loading, the inbound
//! gateway and the outbound client setup. Heartbeat check failures are not
//! errors: they are classified into a `HeartbeatOutcome` and logged.

use thiserror::Error;

/// The primary error type for Crossbeat operations.
#[derive(Error, Debug)]
pub enum CrossbeatError {
    /// Configuration-related errors (missing secret, invalid endpoint, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound server errors (bind failures, serve loop exits, etc.)
    #[error("Server error: {0}")]
    Server(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Crossbeat operations.
pub type Result<T> = std::result::Result<T, CrossbeatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrossbeatError::Config("HEARTBEAT_SECRET is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: HEARTBEAT_SECRET is not set"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: CrossbeatError = io_err.into();
        assert!(matches!(err, CrossbeatError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CrossbeatError = json_err.into();
        assert!(matches!(err, CrossbeatError::Json(_)));
    }

    #[test]
    fn test_server_error_display() {
        let err = CrossbeatError::Server("listener closed".to_string());
        assert_eq!(err.to_string(), "Server error: listener closed");
    }
}
