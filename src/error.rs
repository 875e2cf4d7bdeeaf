use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request outcome taxonomy. Everything a handler can fail with is one of
/// these; storage and crypto faults collapse into `Internal` at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Deliberately generic so callers cannot tell a missing user from a bad
    /// password or a bad token from a revoked one.
    #[error("Invalid credentials or token")]
    Auth,

    #[error("Account is disabled")]
    Forbidden,

    #[error("Account is temporarily locked, try again later")]
    Locked,

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl AppError {
    /// Stable machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid_request",
            AppError::Conflict(_) => "conflict",
            AppError::Auth => "invalid_credentials",
            AppError::Forbidden => "account_disabled",
            AppError::Locked => "account_locked",
            AppError::RateLimited => "rate_limited",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Locked => StatusCode::LOCKED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref err) = self {
            // Full detail stays server-side; the caller gets an opaque message.
            error!(error = %err, "internal error");
        }
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Locked.status(), StatusCode::LOCKED);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_error_is_generic() {
        let msg = AppError::Auth.to_string();
        assert!(!msg.contains("user"));
        assert!(!msg.contains("password"));
        assert_eq!(AppError::Auth.code(), "invalid_credentials");
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.to_string(), "Internal server error");
    }
}
