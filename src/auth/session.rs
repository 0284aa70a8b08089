use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::oauth::GrantError;
use crate::AppState;

/// Request-scoped proof of a live browser session. Inserted into request
/// extensions by [`session_layer`]; never stored in shared process state.
#[derive(Debug, Clone)]
pub struct SessionAuth {
    pub session_id: Uuid,
    pub user_id: i64,
    pub access_token: String,
}

/// Pull the session id out of the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<Uuid> {
    let raw = headers.get("cookie")?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == cookie_name)
            .then(|| Uuid::parse_str(value.trim()).ok())
            .flatten()
    })
}

/// `stale` means the access token's remaining lifetime is at or below the
/// threshold (or it is already expired). Only stale tokens are refreshed.
pub fn is_stale(now: DateTime<Utc>, expires: DateTime<Utc>, threshold_secs: i64) -> bool {
    expires <= now + Duration::seconds(threshold_secs)
}

/// Session middleware for session-backed routes.
///
/// Loads the session row named by the cookie and attaches a [`SessionAuth`]
/// extension. When the session's access token is stale, the stored refresh
/// token is spent on an in-band rotation first, and the session row is
/// updated with the new pair. A failed rotation leaves the request
/// unauthenticated for its remainder; the session row itself is kept.
pub async fn session_layer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(auth) = establish(&state, req.headers()).await {
        req.extensions_mut().insert(auth);
    }
    next.run(req).await
}

async fn establish(state: &AppState, headers: &HeaderMap) -> Option<SessionAuth> {
    let session_id = session_cookie(headers, &state.config.cookie_name)?;

    let session = match state.db.find_session(session_id).await {
        Ok(found) => found?,
        Err(e) => {
            tracing::error!("session lookup failed: {:#}", e);
            return None;
        }
    };

    let token = match state
        .issuer
        .validate_access_token(&state.db, &session.access_token)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("session token lookup failed: {:#}", e);
            return None;
        }
    };

    let stale = match &token {
        Some(t) => is_stale(
            Utc::now(),
            t.access_token_expires,
            state.config.refresh_threshold_secs,
        ),
        // Row gone or expired: only a refresh can save this session.
        None => true,
    };

    if !stale {
        return Some(SessionAuth {
            session_id,
            user_id: session.user_id,
            access_token: session.access_token,
        });
    }

    let refreshed = state
        .issuer
        .refresh_grant(
            &state.db,
            &state.config.web_client_name,
            &state.config.web_client_secret,
            &session.refresh_token,
        )
        .await;

    match refreshed {
        Ok(pair) => {
            if let Err(e) = state
                .db
                .update_session_tokens(session_id, &pair.access_token, &pair.refresh_token)
                .await
            {
                tracing::error!("session token swap failed: {:#}", e);
                return None;
            }
            tracing::debug!(session = %session_id, "refreshed session access token");
            Some(SessionAuth {
                session_id,
                user_id: session.user_id,
                access_token: pair.access_token,
            })
        }
        Err(GrantError::Internal(e)) => {
            tracing::error!("session refresh failed: {:#}", e);
            None
        }
        Err(e) => {
            // Refresh token invalid or already spent: the request proceeds
            // unauthenticated, the session row stays.
            tracing::debug!(session = %session_id, "session refresh rejected: {e}");
            None
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
