//! # Error Types
//!
//! Custom error types for HoTT telemetry using `thiserror`.

use thiserror::Error;

/// Main error type for HoTT telemetry
#[derive(Debug, Error)]
pub enum HottError {
    /// Serial port errors (open failures, unsupported settings)
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HoTT telemetry
pub type Result<T> = std::result::Result<T, HottError>;
