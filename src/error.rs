use axum::http::StatusCode;
use serde::Serialize;

use crate::{auth::AuthError, db::dao::DaoLayerError};

const STORE_FAILURE_MESSAGE: &str =
    "database operation failed. Please check the logs for more details";

/// Stable, machine-readable error class sent as `error` in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "authentication_error")]
    Authentication,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Expired,
    AlreadyUsed,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication | ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Expired | ErrorKind::AlreadyUsed => StatusCode::GONE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    pub fn already_used(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyUsed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Rebuilds an error from a bare status, used for rejections produced outside
    /// the handlers.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::GONE => ErrorKind::Expired,
            _ if status.is_client_error() => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        };
        Self::new(kind, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(message) => AppError::bad_request(message),
            AuthError::Authentication => {
                AppError::new(ErrorKind::Authentication, AuthError::Authentication.to_string())
            }
            AuthError::Unauthorized(message) => AppError::unauthorized(message),
            AuthError::Forbidden(message) => AppError::forbidden(message),
            AuthError::NotFound(message) => AppError::not_found(message),
            AuthError::Expired(message) => AppError::expired(message),
            AuthError::AlreadyUsed(message) => AppError::already_used(message),
            AuthError::Conflict(message) => AppError::conflict(message),
            AuthError::Internal(message) => {
                tracing::error!(error = %message, "internal auth failure");
                AppError::internal("internal server error")
            }
            AuthError::Store(err) => AppError::from(err),
        }
    }
}

impl From<DaoLayerError> for AppError {
    fn from(err: DaoLayerError) -> Self {
        match err {
            DaoLayerError::NotFound { .. } => {
                tracing::debug!(error = %err, "store lookup missed");
                AppError::not_found("Resource not found")
            }
            DaoLayerError::UniqueViolation(_) => AppError::conflict("Resource already exists"),
            DaoLayerError::Db(_) => {
                tracing::error!(error = %err, "store failure");
                AppError::internal(STORE_FAILURE_MESSAGE)
            }
        }
    }
}
