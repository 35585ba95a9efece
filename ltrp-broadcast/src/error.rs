//! Error types for ltrp-broadcast
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for ltrp-broadcast
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sound catalog construction errors
    #[error("Sound catalog error: {0}")]
    Catalog(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared configuration layer
    #[error(transparent)]
    Common(#[from] ltrp_common::Error),
}

/// Convenience Result type using ltrp-broadcast Error
pub type Result<T> = std::result::Result<T, Error>;
