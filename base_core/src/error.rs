//! Error types shared by the storage, security and cache layers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BaseError>;

#[derive(Error, Debug)]
pub enum BaseError {
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BaseError {
    /// Wraps an I/O failure with the operation and target it occurred on.
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        BaseError::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BaseError::NotFound(_))
    }
}

impl From<config::ConfigError> for BaseError {
    fn from(err: config::ConfigError) -> Self {
        BaseError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for BaseError {
    fn from(err: validator::ValidationErrors) -> Self {
        BaseError::Config(err.to_string())
    }
}

impl IntoResponse for BaseError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            BaseError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            BaseError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            BaseError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            BaseError::Authorization(msg) => (StatusCode::FORBIDDEN, msg),
            BaseError::Json(err) => {
                tracing::error!("JSON error: {:?}", err);
                (StatusCode::BAD_REQUEST, "Invalid JSON data".to_string())
            }
            BaseError::Storage { message, source } => {
                tracing::error!("Storage error: {}: {:?}", message, source);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            BaseError::Io(err) => {
                tracing::error!("IO error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            BaseError::Config(msg) | BaseError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            BaseError::Other(err) => {
                tracing::error!("Unexpected error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
