//! HTTP error mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use kubecred_credentials::CredentialError;

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors a handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client error (400) with the message shown to the caller.
    #[error("{0}")]
    BadRequest(String),

    /// Store failure (500); the message is passed through unchanged.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a protocol error, answering invalid input with `invalid_input_msg`.
    pub fn from_credential(e: CredentialError, invalid_input_msg: &str) -> Self {
        match e {
            CredentialError::InvalidInput(_) => Self::BadRequest(invalid_input_msg.into()),
            CredentialError::StoreUnavailable(msg) => Self::Internal(msg),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
