use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the matching core.
#[derive(Error, Debug)]
pub enum MatchingError {
    /// An id did not resolve. Surfaced to the caller, never retried.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The persistence layer or a collaborator could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// User-facing rejection (bad quantities, empty quote, non-quote conversion).
    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type MatchingResult<T> = Result<T, MatchingError>;

impl MatchingError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for MatchingError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::Unavailable("row vanished mid-request".to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl IntoResponse for MatchingError {
    fn into_response(self) -> Response {
        let status = match &self {
            MatchingError::NotFound { .. } => StatusCode::NOT_FOUND,
            MatchingError::Validation(_) => StatusCode::BAD_REQUEST,
            MatchingError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                StatusCode::SERVICE_UNAVAILABLE
            }
            MatchingError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
