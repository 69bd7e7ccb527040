use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use pantry_db::DbError;
use pantry_mail::MailError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid or expired verification code")]
    InvalidOrExpiredCode,

    #[error("{0}")]
    DependencyUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable error kind sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::InvalidOrExpiredCode => "invalid_or_expired_code",
            Self::DependencyUnavailable(_) => "dependency_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                error!("Internal error: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => Self::NotFound(what.to_string()),
            DbError::Forbidden(_) => Self::PermissionDenied(e.to_string()),
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::Invalid(msg) => Self::Validation(msg),
            DbError::Poisoned(_) | DbError::Sqlite(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::CacheUnavailable(_) | MailError::QueueClosed | MailError::QueueFull => {
                Self::DependencyUnavailable(e.to_string())
            }
            MailError::Address(_) | MailError::Delivery(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections render as [`ApiError::Validation`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_kinds() {
        assert_eq!(ApiError::from(DbError::NotFound("recipe")).kind(), "not_found");
        assert_eq!(ApiError::from(DbError::Forbidden("comment")).kind(), "permission_denied");
        assert_eq!(ApiError::from(DbError::Conflict("x".into())).kind(), "conflict");
        assert_eq!(ApiError::from(DbError::Invalid("x".into())).kind(), "validation_error");
    }

    #[test]
    fn mail_errors_map_to_dependency_unavailable() {
        let err = ApiError::from(MailError::QueueClosed);
        assert_eq!(err.kind(), "dependency_unavailable");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
