use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::resolver;
use crate::auth::session::SessionAuth;
use crate::errors::AppError;
use crate::jsend;
use crate::models::client::ClientResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub display_name: String,
    pub client_name: String,
    pub client_secret: String,
}

/// POST /api/v1/clients — register an OAuth2 client application.
/// Requires a user principal; the client itself is immutable once created.
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionAuth>>,
    headers: HeaderMap,
    Json(req): Json<CreateClientRequest>,
) -> Result<Response, AppError> {
    let session = session.as_ref().map(|Extension(auth)| auth);
    resolver::require_user_principal(&state.db, &state.issuer, &headers, session).await?;

    let display_name = req.display_name.trim();
    let client_name = req.client_name.trim();
    if display_name.len() < 4 {
        return Err(AppError::Validation(
            "displayName must be at least 4 characters".into(),
        ));
    }
    if client_name.len() < 4 {
        return Err(AppError::Validation(
            "clientName must be at least 4 characters".into(),
        ));
    }
    if req.client_secret.len() < 10 {
        return Err(AppError::Validation(
            "clientSecret must be at least 10 characters".into(),
        ));
    }

    let client = state
        .db
        .insert_client(display_name, client_name, &req.client_secret)
        .await?
        .ok_or_else(|| AppError::Conflict("Client name already in use".into()))?;

    Ok(jsend::success_with_status(
        StatusCode::CREATED,
        ClientResponse::from(client),
    ))
}
