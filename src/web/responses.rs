//! HTTP response types and utilities
//!
//! Every endpoint answers with a JSON envelope carrying a `code` of
//! `success` or `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCode {
    Success,
    Error,
}

/// Standard API response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: ResponseCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            code: ResponseCode::Success,
            data: Some(data),
            message: None,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

impl ApiResponse<()> {
    /// `{"code": "success"}` with no payload
    pub fn empty() -> Self {
        Self {
            code: ResponseCode::Success,
            data: None,
            message: None,
            filename: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            code: ResponseCode::Error,
            data: None,
            message: Some(message),
            filename: None,
        }
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message) = match &error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            format!("{} '{}' not found", resource, id),
        ),
        AppError::ExternalService { service, message } => (
            StatusCode::BAD_GATEWAY,
            format!("{} failed: {}", service, message),
        ),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {}", message),
        ),
        AppError::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "File operation failed".to_string(),
        ),
        AppError::Csv(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not process CSV data: {}", e),
        ),
        AppError::Json(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not serialize data".to_string(),
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", message),
        ),
    };

    if error.is_client_error() {
        debug!(status = status.as_u16(), "Request rejected: {}", error);
    } else {
        error!(status = status.as_u16(), "Request failed: {}", error);
    }

    (status, Json(ApiResponse::error(message))).into_response()
}

/// Success response helpers
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Success envelope that also names the file it describes
pub fn ok_with_filename<T: Serialize>(data: T, filename: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success(data).with_filename(filename)),
    )
        .into_response()
}

pub fn ok_empty() -> Response {
    (StatusCode::OK, Json(ApiResponse::empty())).into_response()
}

/// Error response helpers
pub fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(message.to_string())),
    )
        .into_response()
}
