use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::errors::AppError;
use crate::AppState;

pub mod clients;
pub mod feeds;
pub mod users;

/// Build the REST API router. The caller mounts this under `/api/v1`.
/// These routes are session-free: credentials arrive as bearer tokens or
/// feed API keys only.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users",
            get(users::get_current_user).post(users::create_user),
        )
        .route("/clients", axum::routing::post(clients::create_client))
        .route("/feeds", get(feeds::list_feeds))
        .route(
            "/feeds/:id_or_key",
            get(feeds::get_feed).put(feeds::upload),
        )
        .layer(CorsLayer::permissive())
        .fallback(fallback_404)
}

async fn fallback_404() -> AppError {
    AppError::NotFound
}
