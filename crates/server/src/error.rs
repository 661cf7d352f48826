//! Error types for the Folio server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_core::FolioError;
use thiserror::Error;

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Handler error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Conversion(#[from] FolioError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound(path) => {
                tracing::debug!(%path, "no content route");
                (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
            }
            AppError::Conversion(e) if e.is_not_found() => {
                tracing::warn!(error = %e, "article unavailable");
                (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
            }
            AppError::Conversion(e) => {
                tracing::error!(error = %e, "conversion failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error\n").into_response()
            }
        }
    }
}

/// Response for paths no route handles.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}
