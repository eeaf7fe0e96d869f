//! HTTP-facing error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Error body returned by JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// API error type that converts to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                code: "bad_request",
                message: message.into(),
            },
        }
    }

    /// 502 Bad Gateway, for failures of the remote inference API.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            body: ErrorResponse {
                code: "upstream_error",
                message: message.into(),
            },
        }
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                code: "internal_error",
                message: message.into(),
            },
        }
    }

    /// Status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Embedding(e) | PipelineError::Generation(e) => {
                ApiError::upstream(e.to_string())
            }
            PipelineError::Store(e) => ApiError::internal(e.to_string()),
            PipelineError::Task(msg) => ApiError::internal(msg),
        }
    }
}
