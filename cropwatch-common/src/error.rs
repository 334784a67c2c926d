//! Common error types for CropWatch

use thiserror::Error;

/// Common result type for CropWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across CropWatch services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation failed (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failed (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or did not validate
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Anything that should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}
