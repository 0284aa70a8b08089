//! Feedstore — multi-tenant sensor feed repository.
//!
//! The binary in `main.rs` is a thin wrapper; everything lives here so the
//! integration tests in `tests/` can exercise the same modules.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod errors;
pub mod jobs;
pub mod jsend;
pub mod models;
pub mod oauth;
pub mod store;
pub mod web;

use datastore::Datastore;
use oauth::Issuer;
use store::PgStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub datastore: Arc<dyn Datastore>,
    pub issuer: Issuer,
    pub config: config::Config,
}
