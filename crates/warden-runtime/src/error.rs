//! Runtime error types

use thiserror::Error;
use warden_core::WardenError;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised by the runtime wrappers
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Rejection from the validation core
    #[error(transparent)]
    Security(#[from] WardenError),

    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signature verification failed: {0}")]
    SignatureRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Check if this is a critical security error that should trigger alerts
    pub fn is_critical(&self) -> bool {
        match self {
            RuntimeError::Security(e) => e.is_critical(),
            RuntimeError::SignatureRejected(_) => true,
            _ => false,
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            RuntimeError::Security(e) => e.category(),
            RuntimeError::Deserialization(_) => "deserialization",
            RuntimeError::Io(_) => "io_error",
            RuntimeError::SignatureRejected(_) => "signature_rejected",
            RuntimeError::Config(_) => "configuration_error",
        }
    }

    /// The core rejection, if this error is one
    pub fn as_security(&self) -> Option<&WardenError> {
        match self {
            RuntimeError::Security(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(error: serde_json::Error) -> Self {
        RuntimeError::Deserialization(error.to_string())
    }
}

impl From<config::ConfigError> for RuntimeError {
    fn from(error: config::ConfigError) -> Self {
        RuntimeError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_errors_keep_their_category() {
        let error: RuntimeError = WardenError::TraversalRejected("../x".to_string()).into();
        assert!(error.is_critical());
        assert_eq!(error.category(), "traversal_rejected");
        assert_eq!(error.to_string(), "Path traversal rejected: ../x");
        assert!(error.as_security().is_some());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: RuntimeError = json_error.into();
        assert!(matches!(error, RuntimeError::Deserialization(_)));
        assert!(!error.is_critical());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: RuntimeError = io_error.into();
        assert_eq!(error.category(), "io_error");
        assert!(error.to_string().contains("File not found"));
    }
}
