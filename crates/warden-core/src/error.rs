//! Error taxonomy for path construction and type binding

use thiserror::Error;

/// Result type for warden core operations
pub type WardenResult<T> = Result<T, WardenError>;

/// Error kind without payload, for matching across crate boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidPath,
    TraversalRejected,
    KnownExploitableType,
    UnknownType,
    InsecureConfiguration,
}

/// Every way a core operation can refuse its input.
///
/// All variants are deterministic input-validation failures: retrying with the
/// same input reproduces the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WardenError {
    /// A required input was missing or blank. This is a contract violation by
    /// the caller rather than a security rejection.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path traversal rejected: {0}")]
    TraversalRejected(String),

    #[error("Known exploitable type rejected: '{type_name}' matches '{fragment}'")]
    KnownExploitableType {
        type_name: String,
        fragment: &'static str,
    },

    #[error("Type '{type_name}' from '{assembly}' is not in the allow-list")]
    UnknownType { assembly: String, type_name: String },

    #[error("Insecure serializer configuration: {0}")]
    InsecureConfiguration(String),
}

impl WardenError {
    pub(crate) fn blank(name: &'static str) -> Self {
        WardenError::InvalidArgument {
            name,
            reason: "value must not be empty or whitespace".to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WardenError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            WardenError::InvalidPath(_) => ErrorKind::InvalidPath,
            WardenError::TraversalRejected(_) => ErrorKind::TraversalRejected,
            WardenError::KnownExploitableType { .. } => ErrorKind::KnownExploitableType,
            WardenError::UnknownType { .. } => ErrorKind::UnknownType,
            WardenError::InsecureConfiguration(_) => ErrorKind::InsecureConfiguration,
        }
    }

    /// Everything except a missing or blank argument
    pub fn is_security_rejection(&self) -> bool {
        !matches!(self, WardenError::InvalidArgument { .. })
    }

    /// Whether this error indicates a likely attack rather than a malformed call
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            WardenError::TraversalRejected(_)
                | WardenError::KnownExploitableType { .. }
                | WardenError::UnknownType { .. }
                | WardenError::InsecureConfiguration(_)
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            WardenError::InvalidArgument { .. } => "invalid_argument",
            WardenError::InvalidPath(_) => "invalid_path",
            WardenError::TraversalRejected(_) => "traversal_rejected",
            WardenError::KnownExploitableType { .. } => "known_exploitable_type",
            WardenError::UnknownType { .. } => "unknown_type",
            WardenError::InsecureConfiguration(_) => "insecure_configuration",
        }
    }
}
