//! Persistence layer.
//!
//! The authentication core consumes the Credential Store through the
//! [`CredentialStore`] trait; `PgStore` is the production implementation.
//! Feed and session queries are inherent `PgStore` methods; only the parts
//! the token issuer and credential resolver touch are behind the seam.

use async_trait::async_trait;

use crate::models::client::Client;
use crate::models::feed::Feed;
use crate::models::token::{NewToken, Token};
use crate::models::user::User;

pub mod postgres;

pub use postgres::PgStore;

/// The Feed Permission Index: per-feed visibility, ownership, and the two
/// secret keys, looked up by id or by either key.
#[async_trait]
pub trait FeedIndex: Send + Sync {
    async fn find_feed_by_id(&self, id: i64) -> anyhow::Result<Option<Feed>>;

    /// Match against either `api_key` or `api_key_read_only`.
    async fn find_feed_by_key(&self, key: &str) -> anyhow::Result<Option<Feed>>;
}

/// Lookups and mutations the token issuer and credential resolver need.
///
/// Uniqueness of `client_name`, `access_token` and `refresh_token` is the
/// implementation's responsibility (enforced by the database in `PgStore`).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_client_by_name(&self, client_name: &str) -> anyhow::Result<Option<Client>>;

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;

    async fn insert_token(&self, new: &NewToken) -> anyhow::Result<Token>;

    async fn find_token_by_access(&self, access_token: &str) -> anyhow::Result<Option<Token>>;

    async fn find_token_by_refresh(&self, refresh_token: &str) -> anyhow::Result<Option<Token>>;

    /// Atomically delete the row holding `old_refresh` and insert `new`.
    ///
    /// Returns `None` when `old_refresh` no longer exists: the caller lost
    /// a race or presented a stale token, which is an `invalid_grant`. Of
    /// two concurrent rotations of the same refresh token, exactly one gets
    /// `Some`.
    async fn rotate_token(&self, old_refresh: &str, new: &NewToken)
        -> anyhow::Result<Option<Token>>;

    /// Delete a token pair by its access token (logout). Returns whether a
    /// row was removed.
    async fn delete_token_by_access(&self, access_token: &str) -> anyhow::Result<bool>;
}
