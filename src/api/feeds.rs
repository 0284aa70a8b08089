use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::auth::arbiter::{self, AccessLevel};
use crate::auth::credential::{Credential, FeedIdentifier};
use crate::auth::resolver;
use crate::auth::session::SessionAuth;
use crate::errors::AppError;
use crate::jsend;
use crate::models::feed::{Feed, FeedResponse};
use crate::AppState;

fn session_ref(session: &Option<Extension<SessionAuth>>) -> Option<&SessionAuth> {
    session.as_ref().map(|Extension(auth)| auth)
}

/// Identifier parse and feed lookup run before any authorization:
/// unknown-resource errors take precedence over permission errors, and a
/// path-segment key matching no feed is exactly an unknown resource.
async fn lookup_feed(
    state: &AppState,
    raw: &str,
) -> Result<(Feed, FeedIdentifier), AppError> {
    let identifier = FeedIdentifier::parse(raw).ok_or(AppError::NotFound)?;
    let feed = match &identifier {
        FeedIdentifier::Id(id) => state.db.find_feed_by_id(*id).await?,
        FeedIdentifier::Key(key) => state.db.find_feed_by_key(key).await?,
    };
    feed.map(|feed| (feed, identifier)).ok_or(AppError::NotFound)
}

/// GET /api/v1/feeds/:id_or_key — feed info, keys filtered by access level.
/// The session extension is only present on routes behind the session
/// middleware; the plain API never has one.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    session: Option<Extension<SessionAuth>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (feed, identifier) = lookup_feed(&state, &raw).await?;

    let credential =
        Credential::for_feed_request(&headers, &identifier, session_ref(&session));
    let resolved =
        resolver::resolve_feed_credential(&state.db, &state.db, &state.issuer, &credential)
            .await?;
    let access = arbiter::decide(&feed, &resolved, AccessLevel::ReadOnly)?;

    Ok(jsend::success(FeedResponse::for_level(feed, access.level)))
}

/// PUT /api/v1/feeds/:id_or_key — sample upload; read-write required.
/// The payload is handed to the time-series engine, whose summary is
/// returned verbatim.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    session: Option<Extension<SessionAuth>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Response, AppError> {
    let (feed, identifier) = lookup_feed(&state, &raw).await?;

    let credential =
        Credential::for_feed_request(&headers, &identifier, session_ref(&session));
    let resolved =
        resolver::resolve_feed_credential(&state.db, &state.db, &state.issuer, &credential)
            .await?;
    arbiter::decide(&feed, &resolved, AccessLevel::ReadWrite)?;

    let summary = state
        .datastore
        .import(feed.id, &payload)
        .await
        .map_err(AppError::Internal)?;
    state.db.touch_feed_modified(feed.id).await?;

    Ok(jsend::success(summary))
}

/// GET /api/v1/feeds — feeds visible to the caller: public feeds, plus the
/// caller's own private feeds when a user principal resolves. Per-feed key
/// suppression follows the caller's level on that feed.
pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionAuth>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = resolver::resolve_user_principal(
        &state.db,
        &state.issuer,
        &headers,
        session_ref(&session),
    )
    .await?;

    let feeds = state.db.list_feeds_visible_to(user_id).await?;
    let total_count = feeds.len();
    let rows: Vec<FeedResponse> = feeds
        .into_iter()
        .map(|feed| {
            let level = match user_id {
                Some(uid) if feed.is_owned_by(uid) => AccessLevel::ReadWrite,
                _ => AccessLevel::ReadOnly,
            };
            FeedResponse::for_level(feed, level)
        })
        .collect();

    Ok(jsend::success(json!({
        "rows": rows,
        "totalCount": total_count,
    })))
}
