use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error types produced by the handlers
#[derive(thiserror::Error, Debug)]
pub enum FunctionError {
    /// Malformed client input
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or revoked credential
    #[error("{0}")]
    Auth(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body over the accepted size
    #[error("{0}")]
    TooLarge(String),

    /// An external service call failed
    #[error("{message}")]
    Provider {
        /// Text shown to the caller
        message: String,
        /// Underlying cause, logged only
        detail: String,
    },

    /// An object storage call failed
    #[error("{message}")]
    Storage { message: String, detail: String },

    /// The model returned no candidate or no content part
    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FunctionError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::Auth(msg.into())
    }

    pub fn provider<M: Into<String>, D: std::fmt::Display>(message: M, detail: D) -> Self {
        Self::Provider {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn storage<M: Into<String>, D: std::fmt::Display>(message: M, detail: D) -> Self {
        Self::Storage {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    /// HTTP status this error renders with
    pub fn status_code(&self) -> StatusCode {
        match self {
            FunctionError::Validation(_) => StatusCode::BAD_REQUEST,
            FunctionError::Auth(_) => StatusCode::UNAUTHORIZED,
            FunctionError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            FunctionError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            FunctionError::Provider { .. }
            | FunctionError::Storage { .. }
            | FunctionError::EmptyResponse
            | FunctionError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Full description including the logged-only detail
    pub fn detailed_message(&self) -> String {
        match self {
            FunctionError::Provider { message, detail }
            | FunctionError::Storage { message, detail } => format!("{}: {}", message, detail),
            other => other.to_string(),
        }
    }
}

/// Error body returned to HTTP callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self.detailed_message(), status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
