//! Error types for the Glyphgate service.

use thiserror::Error;

/// Main error type for Glyphgate operations.
#[derive(Error, Debug)]
pub enum GlyphgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GlyphgateError {
    fn from(err: config::ConfigError) -> Self {
        GlyphgateError::Config(err.to_string())
    }
}

/// Result type alias for Glyphgate operations.
pub type Result<T> = std::result::Result<T, GlyphgateError>;
