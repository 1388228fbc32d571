//! Error types for s3ops-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for s3ops-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for s3ops-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid local path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid object key (empty, or containing a backslash)
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// A computed local destination escapes the target directory
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend unreachable or refusing requests
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::InvalidKey(_) => 2, // UsageError
            Error::Config(_) | Error::InvalidUrl(_) => 2,      // UsageError
            Error::StorageUnavailable(_) => 3,                 // StorageUnavailable
            Error::Auth(_) => 4,                               // AuthError
            Error::NotFound(_) => 5,                           // NotFound
            _ => 1,                                            // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::InvalidKey("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::StorageUnavailable("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::PathTraversal("test".into()).exit_code(), 1);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::StorageUnavailable("connection refused".into());
        assert_eq!(err.to_string(), "Storage unavailable: connection refused");

        let err = Error::PathTraversal("../etc/passwd".into());
        assert_eq!(err.to_string(), "Path traversal rejected: ../etc/passwd");
    }
}
