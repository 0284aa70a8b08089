//! Session-backed routes: login, logout, and the current access token.
//!
//! These are the only routes with session middleware; the REST API proper
//! never sees a cookie. Login performs a password grant under the
//! configured web client and stores the resulting pair in the session row,
//! where the refresh interceptor keeps it live.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::session::{self, SessionAuth};
use crate::config::Config;
use crate::errors::AppError;
use crate::jsend;
use crate::oauth::GrantError;
use crate::store::CredentialStore;
use crate::AppState;

pub fn web_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/access-token", get(access_token))
        .layer(axum::middleware::from_fn_with_state(
            state,
            session::session_layer,
        ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /login — authenticate and open a session.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let issued = state
        .issuer
        .password_grant(
            &state.db,
            &state.config.web_client_name,
            &state.config.web_client_secret,
            req.email.trim(),
            &req.password,
        )
        .await;

    let issued = match issued {
        Ok(token) => token,
        Err(GrantError::InvalidResourceOwner) => {
            return Ok(jsend::error(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ));
        }
        Err(GrantError::InvalidClient) => {
            // The web client row is missing or its secret is wrong: a
            // deployment problem, not the user's.
            return Err(AppError::Internal(anyhow::anyhow!(
                "web client credentials rejected; check FEEDSTORE_WEB_CLIENT_*"
            )));
        }
        Err(GrantError::Internal(e)) => return Err(AppError::Internal(e)),
        Err(e) => return Err(AppError::Internal(anyhow::anyhow!(e))),
    };

    let session_id = Uuid::new_v4();
    state
        .db
        .insert_session(
            session_id,
            issued.user_id,
            &issued.access_token,
            &issued.refresh_token,
        )
        .await?;

    let mut resp = jsend::success(json!({ "userId": issued.user_id }));
    resp.headers_mut().insert(
        SET_COOKIE,
        session_cookie_value(&state.config, &session_id.to_string())?,
    );
    Ok(resp)
}

/// POST /logout — spend the session's token pair and drop the session.
async fn logout(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<SessionAuth>>,
) -> Result<Response, AppError> {
    let Some(Extension(auth)) = auth else {
        return Err(AppError::NoCredential);
    };

    state.db.delete_token_by_access(&auth.access_token).await?;
    state.db.delete_session(auth.session_id).await?;

    let mut resp = jsend::success(serde_json::Value::Null);
    // Expire the cookie client-side as well.
    let cleared = format!(
        "{}=; Path=/; HttpOnly; Max-Age=0{}",
        state.config.cookie_name,
        secure_suffix(&state.config)
    );
    resp.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cleared)
            .map_err(|e| AppError::Internal(e.into()))?,
    );
    Ok(resp)
}

/// GET /access-token — the session's current access token. The refresh
/// interceptor has already rotated a stale pair by the time this runs.
async fn access_token(
    auth: Option<Extension<SessionAuth>>,
) -> Result<Response, AppError> {
    let Some(Extension(auth)) = auth else {
        return Err(AppError::NoCredential);
    };
    Ok(jsend::success(json!({ "accessToken": auth.access_token })))
}

fn session_cookie_value(config: &Config, session_id: &str) -> Result<HeaderValue, AppError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly{}",
        config.cookie_name,
        session_id,
        secure_suffix(config)
    );
    HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.into()))
}

fn secure_suffix(config: &Config) -> &'static str {
    if config.cookie_secure {
        "; Secure"
    } else {
        ""
    }
}
