//! Error handling module for hyprsetup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.

use thiserror::Error;

/// Main error type for hyprsetup
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (file operations, state dir, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (component selections, disk space values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Session state machine transition errors
    #[error("Session transition error: {0}")]
    Transition(String),

    /// Unresolvable package conflicts
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// Package manager failures (install, query)
    #[error("Package error: {0}")]
    Package(String),

    /// Session lookup failures
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// History recording failures
    #[error("History error: {0}")]
    History(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for hyprsetup operations
pub type Result<T> = std::result::Result<T, SetupError>;

// Convenient error constructors
impl SetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a package error
    pub fn package(msg: impl Into<String>) -> Self {
        Self::Package(msg.into())
    }

    /// Create a history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::config("missing components list");
        assert_eq!(err.to_string(), "Configuration error: missing components list");

        let err = SetupError::validation("available exceeds total");
        assert_eq!(err.to_string(), "Validation error: available exceeds total");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SetupError = io_err.into();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn test_error_constructors() {
        let err = SetupError::package("pacman exited with status 1");
        assert!(matches!(err, SetupError::Package(_)));

        let err = SetupError::conflict("mako and dunst collide");
        assert!(matches!(err, SetupError::Conflict(_)));
    }
}
