//! Error types shared by the services and the stores behind them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Errors returned by the storage traits.
///
/// `NotFound` is a sentinel the services match on; everything else is
/// treated as infrastructure failure unless it is a `Conflict`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict
            }
            _ => StoreError::Database(e),
        }
    }
}

/// Domain-level errors produced by the services.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Ownership violation. Rendered exactly like `NotFound`.
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid token")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("malformed token")]
    TokenMalformed,
    #[error("{0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Conflict => AppError::AlreadyExists,
            StoreError::Database(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::NotFound | AppError::Unauthorized => (StatusCode::NOT_FOUND, "not_found"),
            AppError::AlreadyExists => (StatusCode::CONFLICT, "already_exists"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::TokenInvalid | AppError::TokenMalformed => {
                (StatusCode::UNAUTHORIZED, "invalid_token")
            }
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = match &self {
            AppError::Unauthorized => AppError::NotFound.to_string(),
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
