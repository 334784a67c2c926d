//! Error types for the outbreak engine service
//!
//! Every handler returns `Result<_, Error>`; the `IntoResponse` impl maps
//! errors onto HTTP statuses. Internal failures are logged server-side and
//! reported to the client without detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use cropwatch_common::model::ValidationError;

/// Main error type for the outbreak engine
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected submission payload
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not hold the owner token for the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Database connection or query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server failure
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O failure
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error bubbled up from the shared library
    #[error(transparent)]
    Common(#[from] cropwatch_common::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Common(cropwatch_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Common(cropwatch_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // details stay in the log
            tracing::error!("request failed: {}", self);
            json!({ "status": "error", "error": "internal error" })
        } else {
            json!({ "status": "error", "error": self.to_string() })
        };
        (status, Json(body)).into_response()
    }
}
