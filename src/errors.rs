use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::jsend;

/// Request-level failure taxonomy. Every kind carries its HTTP status as
/// data; nothing is inferred from error shape downstream.
///
/// 401 is reserved for "no credential was presented at all"; any
/// presented-but-wrong credential is `Forbidden`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    NoCredential,

    #[error("access denied")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::NoCredential => "Authentication required".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Conflict(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::Internal(e) => {
                // Log the cause, never expose it to the caller
                tracing::error!("internal error: {:#}", e);
                "Sorry, an unexpected error occurred".to_string()
            }
        };
        jsend::error(status, &message)
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_fixed_per_kind() {
        assert_eq!(AppError::NoCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation("bad email".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused"));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
