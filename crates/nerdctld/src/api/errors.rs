//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::bridge::{ActionErrorKind, BridgeError, DispatchError};

/// Errors rendered as `{"message": ...}` responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No route matched the method and path.
    #[error("page not found")]
    PageNotFound,
    /// Dispatching the request failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ApiError {
    /// HTTP status for the error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::PageNotFound => StatusCode::NOT_FOUND,
            Self::Dispatch(DispatchError::Bridge(BridgeError::UnknownFlag { .. }))
            | Self::Dispatch(DispatchError::Join { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Dispatch(DispatchError::Bridge(_)) => StatusCode::BAD_REQUEST,
            Self::Dispatch(DispatchError::Action(action)) => match action.kind() {
                ActionErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                ActionErrorKind::NotFound => StatusCode::NOT_FOUND,
                ActionErrorKind::Conflict => StatusCode::CONFLICT,
                ActionErrorKind::Failed => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub(super) struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub(super) async fn not_found() -> ApiError {
    ApiError::PageNotFound
}
