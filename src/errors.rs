use crate::services::{blob_store::BlobStoreError, gallery_service::GalleryError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Collapse domain failures into the generic error page. Details are logged
/// here and never reach the client.
impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        match &err {
            e if e.is_validation() => {
                tracing::debug!("rejected upload: {}", err);
                AppError::bad_request("upload rejected")
            }
            GalleryError::Storage(BlobStoreError::NotFound(_)) => {
                AppError::not_found("image not found")
            }
            GalleryError::Storage(BlobStoreError::InvalidIdentifier(_)) => {
                tracing::warn!("refused identifier: {}", err);
                AppError::bad_request("invalid image name")
            }
            _ => {
                tracing::error!("request failed: {}", err);
                AppError::internal("something went wrong")
            }
        }
    }
}
