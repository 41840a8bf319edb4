//! Error types for vasvault.

use thiserror::Error;

/// Common error type for vasvault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Persistence layer failure.
    ///
    /// Covers constraint violations and connectivity problems from the
    /// metadata store. Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Filesystem failure while creating, writing, reading or removing
    /// stored files. The message carries the operation that failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unique value already taken.
    #[error("{0} already exists")]
    Conflict(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

/// Result type alias for vasvault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = VaultError::Storage("failed to save file: disk full".to_string());
        assert_eq!(err.to_string(), "storage error: failed to save file: disk full");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = VaultError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = VaultError::Conflict("email".to_string());
        assert_eq!(err.to_string(), "email already exists");
    }

    #[test]
    fn test_auth_error_display() {
        let err = VaultError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VaultError = io_err.into();
        assert!(matches!(err, VaultError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: VaultError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, VaultError::Database(_)));
    }
}
