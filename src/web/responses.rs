use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub meta: Option<Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn success_with_meta(data: T, meta: Value) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(data)
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
            meta: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Errors returned by the JSON API.
#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    InternalServerError(String),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            WebError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::BadRequest(_) => "BAD_REQUEST",
            WebError::NotFound(_) => "NOT_FOUND",
            WebError::BadGateway(_) => "REFRESH_FAILED",
            WebError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WebError::BadRequest(msg)
            | WebError::NotFound(msg)
            | WebError::BadGateway(msg)
            | WebError::InternalServerError(msg) => msg,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        WebError::NotFound(format!("{} not found", resource.into()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WebError::InternalServerError(message.into())
    }
}

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => WebError::BadRequest(msg),
            AppError::NotFound { resource } => WebError::not_found(resource),
            e if e.is_cycle_failure() => WebError::BadGateway(e.to_string()),
            e => {
                tracing::error!("Request failed: {}", e);
                WebError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiResponse::<()>::error(self.error_code(), self.message());
        (status, Json(body)).into_response()
    }
}
