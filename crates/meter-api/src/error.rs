//! API error types and conversions

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::staging::UploadRejection;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// Request rejected while reading the body (413 for oversized uploads)
    Rejected { status: StatusCode, message: String },
    /// 500 - inference or decoding failed
    Processing(String),
    /// 500 - reading was decoded but could not be stored
    Persistence {
        message: String,
        reading: String,
        confidence: f32,
    },
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error response that still carries the decoded reading
#[derive(Serialize)]
struct PersistenceErrorResponse {
    error: String,
    reading: String,
    confidence: f32,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Persistence {
            message,
            reading,
            confidence,
        } = self
        {
            tracing::error!(%message, %reading, "Failed to persist reading");

            let body = Json(PersistenceErrorResponse {
                error: message,
                reading,
                confidence,
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        }

        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Processing(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing image: {}", msg),
            ),
            ApiError::Persistence { .. } => unreachable!(), // Handled above
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), %message, "API client error");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<UploadRejection> for ApiError {
    fn from(rejection: UploadRejection) -> Self {
        ApiError::BadRequest(rejection.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}
