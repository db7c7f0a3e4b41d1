use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::models::ModelError;

use super::utils::server_error_response;

/// Failure of a request handler. Client errors map onto their status codes, everything else is
/// logged and answered with the generic 500 page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request")]
    BadRequest,
    #[error("not found")]
    NotFound,
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest => (
                StatusCode::BAD_REQUEST,
                StatusCode::BAD_REQUEST.canonical_reason().unwrap_or("Bad Request"),
            )
                .into_response(),
            AppError::NotFound | AppError::Model(ModelError::NotFound) => (
                StatusCode::NOT_FOUND,
                StatusCode::NOT_FOUND.canonical_reason().unwrap_or("Not Found"),
            )
                .into_response(),
            err => {
                error!(target: "server", %err, "request failed");
                server_error_response()
            }
        }
    }
}
