//! Error types for the leaderboard API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use perceval_core::competition::CompetitionError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested group or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The request carried malformed or rejected input.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CompetitionError> for ApiError {
    fn from(err: CompetitionError) -> Self {
        match err {
            CompetitionError::Lookup { .. } => Self::NotFound(err.to_string()),
            CompetitionError::Forbidden => Self::Forbidden(err.to_string()),
            CompetitionError::NotGuessable(_)
            | CompetitionError::Roster { .. }
            | CompetitionError::InvalidGroup { .. }
            | CompetitionError::SlotOutOfRange { .. } => Self::InvalidQuery(err.to_string()),
            CompetitionError::Round { .. } | CompetitionError::Submission { .. } => {
                tracing::error!(error = %err, "Competition failure while serving request");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
