//! Common error types for the work-log tracker

use thiserror::Error;

/// Common result type for work-log operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tracker crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record was modified concurrently (e.g. log already closed)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True when the error reports a concurrent modification rather than a failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        assert!(Error::Conflict("log abc".to_string()).is_conflict());
        assert!(!Error::NotFound("log abc".to_string()).is_conflict());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::Config("missing break channel".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing break channel");
    }
}
