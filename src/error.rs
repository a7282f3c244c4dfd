use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::forms::FormError;

// Postgres SQLSTATE codes the repository classifies.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// RepoError
///
/// Failure modes of the persistence layer. Rows outside the caller's read scope surface
/// as `NotFound` so their existence is not disclosed.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("operation not permitted for this principal")]
    Forbidden,
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return RepoError::NotFound;
        }
        if let Some(db_err) = err.as_database_error() {
            let detail = db_err
                .constraint()
                .map(str::to_string)
                .unwrap_or_else(|| db_err.message().to_string());
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return RepoError::Conflict(detail),
                Some(FOREIGN_KEY_VIOLATION) => return RepoError::InvalidReference(detail),
                Some(CHECK_VIOLATION) => {
                    return RepoError::Invalid(format!("value rejected by constraint {detail}"));
                }
                _ => {}
            }
        }
        RepoError::Database(err)
    }
}

/// ApiError
///
/// The single error type returned by handlers. Every variant renders as
/// `{"success": false, "message": ...}` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("submission rejected")]
    Validation(FormError),
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ApiError::NotFound("record not found".to_string()),
            RepoError::Forbidden => {
                ApiError::Forbidden("operation not permitted for this principal".to_string())
            }
            RepoError::Conflict(detail) => {
                ApiError::Conflict(format!("record already exists ({detail})"))
            }
            RepoError::InvalidReference(detail) => {
                ApiError::BadRequest(format!("invalid reference ({detail})"))
            }
            RepoError::Invalid(message) => ApiError::BadRequest(message),
            RepoError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        ApiError::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Internal(cause) => {
                // The cause stays in the logs; clients get the generic message.
                tracing::error!(cause = %cause, "request failed");
                json!({ "success": false, "message": self.to_string() })
            }
            ApiError::Validation(form_error) => json!({
                "success": false,
                "message": self.to_string(),
                "errors": form_error.issues,
            }),
            _ => json!({ "success": false, "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
