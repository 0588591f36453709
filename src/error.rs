// src/error.rs

//! Unified error handling for the pipeline handler.

use std::fmt;

use thiserror::Error;

/// Result type alias for handler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Pipeline service call failed
    #[error("{operation} failed: {message}")]
    Upstream { operation: String, message: String },

    /// Inbound trigger payload did not have the expected shape
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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
    /// Create a pipeline service error for the named operation.
    pub fn upstream(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed event error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
