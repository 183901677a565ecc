use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{LoadError, export::ExportError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load deliveries: {0}")]
    Load(#[from] LoadError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// Convert AppError to an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Load(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Export error".into()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        tracing::error!(error = %self, "Request failed");
        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type Result<T> = std::result::Result<T, AppError>;
