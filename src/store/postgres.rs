use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::client::Client;
use crate::models::feed::Feed;
use crate::models::token::{NewToken, Token};
use crate::models::user::User;

use super::{CredentialStore, FeedIndex};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// A browser session row. Carries the user's current token pair so the
/// refresh interceptor can rotate it in place.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

const TOKEN_COLUMNS: &str =
    "id, access_token, access_token_expires, refresh_token, client_id, user_id, created";

const FEED_COLUMNS: &str =
    "id, name, user_id, api_key, api_key_read_only, is_public, created, modified";

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ── Client Operations ────────────────────────────────────────

    /// Insert a client. Returns `None` when `client_name` is already taken.
    pub async fn insert_client(
        &self,
        display_name: &str,
        client_name: &str,
        client_secret: &str,
    ) -> anyhow::Result<Option<Client>> {
        let result = sqlx::query_as::<_, Client>(
            "INSERT INTO clients (display_name, client_name, client_secret) \
             VALUES ($1, $2, $3) \
             RETURNING id, display_name, client_name, client_secret, created",
        )
        .bind(display_name)
        .bind(client_name)
        .bind(client_secret)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(client) => Ok(Some(client)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_clients(&self) -> anyhow::Result<Vec<Client>> {
        let rows = sqlx::query_as::<_, Client>(
            "SELECT id, display_name, client_name, client_secret, created \
             FROM clients ORDER BY created ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── User Operations ──────────────────────────────────────────

    /// Insert a user (password already hashed). Returns `None` when the
    /// email is already registered.
    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password, display_name) \
             VALUES ($1, $2, $3) \
             RETURNING id, email, password, display_name, created, modified",
        )
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Feed Operations ──────────────────────────────────────────

    pub async fn insert_feed(
        &self,
        name: &str,
        user_id: i64,
        is_public: bool,
        api_key: &str,
        api_key_read_only: &str,
    ) -> anyhow::Result<Feed> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (name, user_id, is_public, api_key, api_key_read_only) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {FEED_COLUMNS}"
        ))
        .bind(name)
        .bind(user_id)
        .bind(is_public)
        .bind(api_key)
        .bind(api_key_read_only)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    pub async fn find_feed_by_id(&self, id: i64) -> anyhow::Result<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Look up a feed by either of its API keys.
    pub async fn find_feed_by_key(&self, key: &str) -> anyhow::Result<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             WHERE api_key = $1 OR api_key_read_only = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Feeds visible to the caller: all public feeds, plus the caller's own
    /// private feeds when a user principal is present.
    pub async fn list_feeds_visible_to(
        &self,
        user_id: Option<i64>,
    ) -> anyhow::Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             WHERE is_public = TRUE OR user_id = $1 \
             ORDER BY id ASC"
        ))
        .bind(user_id.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn touch_feed_modified(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE feeds SET modified = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Session Operations ───────────────────────────────────────

    pub async fn insert_session(
        &self,
        id: Uuid,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
    ) -> anyhow::Result<SessionRow> {
        let session = sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions (id, user_id, access_token, refresh_token) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, access_token, refresh_token, created, modified",
        )
        .bind(id)
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn find_session(&self, id: Uuid) -> anyhow::Result<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, access_token, refresh_token, created, modified \
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Replace the session's stored token pair after an in-band refresh.
    pub async fn update_session_tokens(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE sessions SET access_token = $2, refresh_token = $3, modified = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(access_token)
        .bind(refresh_token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_session(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove sessions not touched since `cutoff`. Used by the background
    /// cleanup job.
    pub async fn purge_idle_sessions(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE modified < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FeedIndex for PgStore {
    async fn find_feed_by_id(&self, id: i64) -> anyhow::Result<Option<Feed>> {
        PgStore::find_feed_by_id(self, id).await
    }

    async fn find_feed_by_key(&self, key: &str) -> anyhow::Result<Option<Feed>> {
        PgStore::find_feed_by_key(self, key).await
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_client_by_name(&self, client_name: &str) -> anyhow::Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, display_name, client_name, client_secret, created \
             FROM clients WHERE client_name = $1",
        )
        .bind(client_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, display_name, created, modified \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password, display_name, created, modified \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_token(&self, new: &NewToken) -> anyhow::Result<Token> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "INSERT INTO tokens \
             (access_token, access_token_expires, refresh_token, client_id, user_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(&new.access_token)
        .bind(new.access_token_expires)
        .bind(&new.refresh_token)
        .bind(new.client_id)
        .bind(new.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(token)
    }

    async fn find_token_by_access(&self, access_token: &str) -> anyhow::Result<Option<Token>> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE access_token = $1"
        ))
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn find_token_by_refresh(&self, refresh_token: &str) -> anyhow::Result<Option<Token>> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn rotate_token(
        &self,
        old_refresh: &str,
        new: &NewToken,
    ) -> anyhow::Result<Option<Token>> {
        // Single transaction keyed on the old refresh token's continued
        // existence: of two concurrent rotations, exactly one sees the
        // deleted row and commits.
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM tokens WHERE refresh_token = $1")
            .bind(old_refresh)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let token = sqlx::query_as::<_, Token>(&format!(
            "INSERT INTO tokens \
             (access_token, access_token_expires, refresh_token, client_id, user_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(&new.access_token)
        .bind(new.access_token_expires)
        .bind(&new.refresh_token)
        .bind(new.client_id)
        .bind(new.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(token))
    }

    async fn delete_token_by_access(&self, access_token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE access_token = $1")
            .bind(access_token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
