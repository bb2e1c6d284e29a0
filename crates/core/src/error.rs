//! Error types for SandboxAI.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using SandboxAI's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SandboxAI.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Embedded Server Errors
    // =========================================================================
    #[error("Required dependency not found: {0}")]
    DependencyMissing(String),

    #[error("Embedded server binary not found at: {}", .0.display())]
    BinaryMissing(PathBuf),

    #[error("Failed to launch embedded server: {0}")]
    LaunchFailed(String),

    #[error("Embedded server handshake failed: {0}")]
    HandshakeFailed(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("Expected status {expected}, got {actual}: {detail}")]
    Protocol {
        expected: u16,
        actual: u16,
        detail: String,
    },

    #[error("Sandbox with name '{name}' not found in space '{space}'")]
    NotFound { space: String, name: String },

    #[error("Transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Sandbox Handle Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sandbox '{name}' in space '{space}' is already created")]
    AlreadyBound { space: String, name: String },

    #[error("{body}; deleting the sandbox on scope exit also failed: {cleanup}")]
    ScopeExit { body: Box<Error>, cleanup: Box<Error> },

    // =========================================================================
    // Tool Errors
    // =========================================================================
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a dependency missing error.
    pub fn dependency_missing(msg: impl Into<String>) -> Self {
        Self::DependencyMissing(msg.into())
    }

    /// Create a launch failure error.
    pub fn launch_failed(msg: impl Into<String>) -> Self {
        Self::LaunchFailed(msg.into())
    }

    /// Create a handshake failure error.
    pub fn handshake_failed(msg: impl Into<String>) -> Self {
        Self::HandshakeFailed(msg.into())
    }

    /// Create a protocol (status mismatch) error.
    pub fn protocol(expected: u16, actual: u16, detail: impl Into<String>) -> Self {
        Self::Protocol {
            expected,
            actual,
            detail: detail.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(space: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            space: space.into(),
            name: name.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid tool arguments error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Whether this error reports a sandbox that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_message() {
        let err = Error::protocol(201, 500, "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "Expected status 201, got 500: Internal Server Error"
        );
    }

    #[test]
    fn test_not_found_carries_space_and_name() {
        let err = Error::not_found("default", "abc123");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Sandbox with name 'abc123' not found in space 'default'"
        );
    }

    #[test]
    fn test_scope_exit_reports_both_errors() {
        let err = Error::ScopeExit {
            body: Box::new(Error::timeout("cell took too long")),
            cleanup: Box::new(Error::transport("connection refused")),
        };
        let msg = err.to_string();
        assert!(msg.contains("cell took too long"));
        assert!(msg.contains("connection refused"));
    }
}
