//! Mapping of extraction failures onto HTTP responses.

use actor_extract_core::ExtractError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::ErrorResponse;

/// Detail sent for any fault the client cannot act on.
pub const INTERNAL_ERROR_DETAIL: &str = "Unexpected server error";

#[derive(Debug)]
pub enum ApiError {
    /// Upload rejected; the message is safe to show the client
    BadRequest(String),
    /// Request body exceeded the configured limit
    PayloadTooLarge(String),
    /// Anything else; logged, never shown
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing detail text.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::BadRequest(detail) | Self::PayloadTooLarge(detail) => detail,
            Self::Internal(_) => INTERNAL_ERROR_DETAIL,
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Validation(e) => Self::BadRequest(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(format!("Invalid multipart request: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            tracing::error!("Request failed: {cause}");
        }
        let body = ErrorResponse {
            detail: self.detail().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
