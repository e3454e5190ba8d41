use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::domain::network::RegistryError;

/// Errors surfaced to HTTP callers.
///
/// Upstream failures never appear here: adapters turn them into absent
/// values before they reach the merge step.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Cause of a fault caught by the error middleware; the client only
    /// ever sees the generic 500 body.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingParameter(_) | Self::UnsupportedNetwork(_))
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ApiError::UnsupportedNetwork(id),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed with internal error");
                internal_error_response()
            }
            _ => HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() })),
        }
    }
}

/// Generic 500 body. Internal detail stays in the logs.
pub fn internal_error_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }))
}

pub fn not_found_response() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not Found" }))
}
