//! OAuth2 token endpoint and issuer.
//!
//! `POST /oauth/token` with `grant_type` of `password` or `refresh_token`.
//! Unlike the rest of the API this endpoint speaks the OAuth2 error dialect
//! (`{error, error_description}` bodies), not the JSend envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod issuer;

pub use issuer::Issuer;

/// Token issuance failures, each with its fixed OAuth2 error code and
/// status. Bad client credentials are 401 by convention of the flow; a bad
/// resource owner or refresh token is 403.
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("invalid client credentials")]
    InvalidClient,

    #[error("invalid resource owner credentials")]
    InvalidResourceOwner,

    #[error("invalid refresh token")]
    InvalidGrant,

    #[error("unsupported grant type")]
    UnsupportedGrantType,

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GrantError {
    pub fn status(&self) -> StatusCode {
        match self {
            GrantError::InvalidClient => StatusCode::UNAUTHORIZED,
            GrantError::InvalidResourceOwner | GrantError::InvalidGrant => {
                StatusCode::FORBIDDEN
            }
            GrantError::UnsupportedGrantType | GrantError::MissingParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            GrantError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The machine-readable `error` field.
    pub fn error_code(&self) -> &'static str {
        match self {
            GrantError::InvalidClient => "invalid_client",
            GrantError::InvalidResourceOwner | GrantError::InvalidGrant => "invalid_grant",
            GrantError::UnsupportedGrantType => "unsupported_grant_type",
            GrantError::MissingParameter(_) => "invalid_request",
            GrantError::Internal(_) => "server_error",
        }
    }

    pub fn description(&self) -> String {
        match self {
            GrantError::InvalidClient => "Invalid client credentials".to_string(),
            GrantError::InvalidResourceOwner => {
                "Invalid resource owner credentials".to_string()
            }
            GrantError::InvalidGrant => "Invalid refresh token".to_string(),
            GrantError::UnsupportedGrantType => "Unsupported grant type".to_string(),
            GrantError::MissingParameter(name) => format!("Missing parameter: {name}"),
            GrantError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for GrantError {
    fn into_response(self) -> Response {
        if let GrantError::Internal(e) = &self {
            tracing::error!("token endpoint failed: {:#}", e);
        }
        let body = Json(json!({
            "error": self.error_code(),
            "error_description": self.description(),
        }));
        (self.status(), body).into_response()
    }
}

// ── Endpoint ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

pub fn oauth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", post(token))
        .layer(CorsLayer::permissive())
}

/// POST /oauth/token — password and refresh_token grants.
async fn token(
    State(state): State<Arc<AppState>>,
    Form(req): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, GrantError> {
    let client_id = req
        .client_id
        .as_deref()
        .ok_or(GrantError::MissingParameter("client_id"))?;
    let client_secret = req
        .client_secret
        .as_deref()
        .ok_or(GrantError::MissingParameter("client_secret"))?;

    let issued = match req.grant_type.as_str() {
        "password" => {
            let username = req
                .username
                .as_deref()
                .ok_or(GrantError::MissingParameter("username"))?;
            let password = req
                .password
                .as_deref()
                .ok_or(GrantError::MissingParameter("password"))?;
            state
                .issuer
                .password_grant(&state.db, client_id, client_secret, username, password)
                .await?
        }
        "refresh_token" => {
            let refresh_token = req
                .refresh_token
                .as_deref()
                .ok_or(GrantError::MissingParameter("refresh_token"))?;
            state
                .issuer
                .refresh_grant(&state.db, client_id, client_secret, refresh_token)
                .await?
        }
        _ => return Err(GrantError::UnsupportedGrantType),
    };

    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        expires_in: state.issuer.access_token_lifetime_secs(),
        token_type: "Bearer",
    }))
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_errors_map_to_oauth2_statuses() {
        assert_eq!(GrantError::InvalidClient.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GrantError::InvalidResourceOwner.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(GrantError::InvalidGrant.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GrantError::UnsupportedGrantType.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn invalid_grant_carries_the_pinned_description() {
        let err = GrantError::InvalidGrant;
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.description(), "Invalid refresh token");
    }

    #[test]
    fn wrong_client_and_stale_refresh_are_distinct_codes() {
        assert_eq!(GrantError::InvalidClient.error_code(), "invalid_client");
        assert_eq!(GrantError::InvalidGrant.error_code(), "invalid_grant");
    }
}
