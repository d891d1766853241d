use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("OCR engine failed: {0}")]
    EngineFailure(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("File type not allowed: {0}")]
    UnsupportedFormat(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Upload exceeds the maximum file size of {max} bytes")]
    UploadTooLarge { max: usize },

    #[error("{0}")]
    MissingFile(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// True for the failures that surface to callers as a generic processing error
    pub fn is_processing_error(&self) -> bool {
        matches!(
            self,
            OcrError::DecodeFailure(_) | OcrError::PreprocessingError(_) | OcrError::EngineFailure(_)
        )
    }

    /// Message shown to HTTP callers
    ///
    /// Decode, preprocessing and engine failures all collapse into one
    /// "Error processing image" message; the variant only survives in logs.
    pub fn public_message(&self) -> String {
        if self.is_processing_error() {
            format!("Error processing image: {}", self)
        } else {
            self.to_string()
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            OcrError::DecodeFailure(_)
            | OcrError::PreprocessingError(_)
            | OcrError::EngineFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
            OcrError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
            OcrError::ImageTooLarge { .. } | OcrError::UploadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            OcrError::MissingFile(_) => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(code, "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
