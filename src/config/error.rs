//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Value out of range for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("Invalid banned phrase '{phrase}': {reason}")]
    InvalidBannedPhrase { phrase: String, reason: String },

    #[error("Invalid log filter '{0}'")]
    InvalidLogLevel(String),
}

impl ValidationError {
    pub(crate) fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}
