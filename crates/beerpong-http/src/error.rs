use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use beerpong_store::StoreError;
use serde::Serialize;
use tracing::error;

/// Errors returned by request handlers, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is malformed or not allowed in the current game state.
    #[error("{0}")]
    BadRequest(String),

    /// The score store failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Anything else that went wrong on our side.
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(error = %self, status = status.as_u16(), "request failed");
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
