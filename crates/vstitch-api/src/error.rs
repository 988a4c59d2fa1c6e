//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vstitch_models::ValidationError;
use vstitch_worker::JobError;

use crate::delivery::DeliveryError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Job(JobError),

    #[error("{0}")]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Replace server-side details with a generic message in production.
    pub fn redact(self, production: bool) -> Self {
        if production && self.status_code().is_server_error() {
            Self::Internal("An internal error occurred".to_string())
        } else {
            self
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Job(_) | ApiError::Delivery(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Validation(v) => ApiError::Validation(v),
            other => ApiError::Job(other),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    invalid_fields: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::Validation(v) => ErrorResponse {
                error: v.message,
                missing_fields: v.missing_fields,
                invalid_fields: v.invalid_fields,
            },
            other => ErrorResponse {
                error: other.to_string(),
                missing_fields: Vec::new(),
                invalid_fields: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}
