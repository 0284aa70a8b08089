use chrono::{DateTime, Utc};

/// An issued access/refresh token pair.
///
/// The access token is valid iff this row exists and `now` is strictly
/// before `access_token_expires`. The refresh token has no expiry of its
/// own; it dies when the row is deleted (rotation or logout).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Token {
    pub id: i64,
    pub access_token: String,
    pub access_token_expires: DateTime<Utc>,
    pub refresh_token: String,
    pub client_id: i64,
    pub user_id: i64,
    pub created: DateTime<Utc>,
}

impl Token {
    /// Exclusive boundary: a token whose expiry equals `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_token_expires
    }
}

/// Fields for a token row about to be persisted.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub access_token: String,
    pub access_token_expires: DateTime<Utc>,
    pub refresh_token: String,
    pub client_id: i64,
    pub user_id: i64,
}

// ── Tests ───────────────────────────────────────────────────────
