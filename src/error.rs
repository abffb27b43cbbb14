// src/error.rs

//! Unified error handling for the repository.

use std::fmt;

use thiserror::Error;

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Path has too few segments or an unrecognized structure
    #[error("Malformed repository path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    /// Terminal file suffix is not one the repository accepts
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// No catalog entry for the requested coordinate
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The artifact exists but has no file for the requested role
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// POM body is not well-formed XML
    #[error("Invalid POM XML: {0}")]
    InvalidPomXml(String),

    /// Upload exceeded the configured size limit
    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catalog schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a malformed path error.
    pub fn malformed_path(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error is a not-found condition rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ArtifactNotFound(_) | Self::FileNotFound(_))
    }

    /// Whether the request was rejected before any I/O happened.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::MalformedPath { .. } | Self::UnsupportedExtension(_) | Self::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(AppError::ArtifactNotFound("g:a:v".into()).is_not_found());
        assert!(AppError::FileNotFound("g:a:v:pom".into()).is_not_found());
        assert!(!AppError::UnsupportedExtension("txt".into()).is_not_found());
    }

    #[test]
    fn test_malformed_path_message() {
        let err = AppError::malformed_path("com/x", "too few segments");
        assert!(err.is_bad_request());
        assert_eq!(
            err.to_string(),
            "Malformed repository path 'com/x': too few segments"
        );
    }
}
