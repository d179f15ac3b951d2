//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::features::export::{ExportError, SheetsError};
use crate::features::seller::{FetchError, ImportError, PipelineError};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
            },
            AppError::Config(message) => {
                tracing::error!("Configuration error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "Server configuration error".to_string(),
                )
            },
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::BadGateway(message) => {
                tracing::warn!("Upstream error: {}", message);
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unauthorized => AppError::Unauthorized(err.to_string()),
            FetchError::Upstream(_) => {
                AppError::BadGateway(format!("Request aborted, error: {}", err))
            },
            FetchError::Reshape(_) | FetchError::Journal(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::EmptyResult { .. } => AppError::NotFound(err.to_string()),
            ImportError::Persistence { .. } | ImportError::Journal(_) => {
                AppError::Internal(err.to_string())
            },
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Fetch(e) => e.into(),
            PipelineError::Import(e) => e.into(),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Sheets(SheetsError::NotConfigured) => AppError::Config(err.to_string()),
            ExportError::Sheets(_) => AppError::BadGateway(err.to_string()),
            ExportError::InvalidRequest(message) => AppError::BadRequest(message),
            ExportError::NotExported | ExportError::Journal(_) => {
                AppError::Internal(err.to_string())
            },
        }
    }
}
