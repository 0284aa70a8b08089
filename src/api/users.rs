use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::auth::resolver;
use crate::auth::session::SessionAuth;
use crate::errors::AppError;
use crate::jsend;
use crate::models::user::UserResponse;
use crate::store::CredentialStore;
use crate::AppState;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

const MIN_PASSWORD_LEN: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// POST /api/v1/users — signup. Anyone may register; duplicate email is a
/// conflict, not a validation failure.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Response, AppError> {
    let email = req.email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(e.into()))?;

    let user = state
        .db
        .insert_user(&email, &hash, display_name)
        .await?
        .ok_or_else(|| AppError::Conflict("Email already in use".into()))?;

    Ok(jsend::success_with_status(
        StatusCode::CREATED,
        UserResponse::from(user),
    ))
}

/// GET /api/v1/users — the authenticated user's own record. Requires a
/// user principal; missing and invalid bearers alike are 401 here.
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionAuth>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = session.as_ref().map(|Extension(auth)| auth);
    let user_id =
        resolver::require_user_principal(&state.db, &state.issuer, &headers, session).await?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(jsend::success(UserResponse::from(user)))
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_enforced() {
        assert!(EMAIL_RE.is_match("u@example.com"));
        assert!(EMAIL_RE.is_match("first.last@sub.example.org"));
        assert!(!EMAIL_RE.is_match("bogus"));
        assert!(!EMAIL_RE.is_match("no at sign.com"));
        assert!(!EMAIL_RE.is_match("trailing@nodot"));
    }
}
