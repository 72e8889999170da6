use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emotion_core::{StoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Client-facing error body. Never carries internal error detail.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: msg.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save emotion data")]
    SaveFailed(#[source] StoreError),

    #[error("Failed to retrieve emotion data")]
    ListFailed(#[source] StoreError),

    #[error("Not allowed by CORS")]
    OriginRejected,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::OriginRejected => StatusCode::FORBIDDEN,
            ApiError::SaveFailed(_) | ApiError::ListFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_parts(self) -> (StatusCode, serde_json::Value) {
        let status = self.status_code();
        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });
        (status, body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
