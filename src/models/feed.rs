use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::arbiter::AccessLevel;

/// A sensor feed: a named time-series stream owned by a user.
///
/// Both API keys are generated once at registration and never rotate.
/// `api_key` grants read-write access to this feed, `api_key_read_only`
/// grants read access, regardless of who presents them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub api_key: String,
    pub api_key_read_only: String,
    pub is_public: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Feed {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Feed info as returned by the API, with the secret keys filtered by the
/// caller's resolved access level: `apiKey` appears only at read-write,
/// `apiKeyReadOnly` only at read access or better.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_read_only: Option<String>,
    pub is_public: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FeedResponse {
    pub fn for_level(feed: Feed, level: AccessLevel) -> Self {
        let api_key = (level == AccessLevel::ReadWrite).then(|| feed.api_key);
        let api_key_read_only =
            (level >= AccessLevel::ReadOnly).then(|| feed.api_key_read_only);
        Self {
            id: feed.id,
            name: feed.name,
            user_id: feed.user_id,
            api_key,
            api_key_read_only,
            is_public: feed.is_public,
            created: feed.created,
            modified: feed.modified,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> Feed {
        Feed {
            id: 7,
            name: "outdoor-air".into(),
            user_id: 3,
            api_key: "a".repeat(64),
            api_key_read_only: "b".repeat(64),
            is_public: true,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn read_write_exposes_both_keys() {
        let json =
            serde_json::to_value(FeedResponse::for_level(feed(), AccessLevel::ReadWrite))
                .unwrap();
        assert!(json.get("apiKey").is_some());
        assert!(json.get("apiKeyReadOnly").is_some());
    }

    #[test]
    fn read_only_suppresses_the_write_key() {
        let json =
            serde_json::to_value(FeedResponse::for_level(feed(), AccessLevel::ReadOnly))
                .unwrap();
        assert!(json.get("apiKey").is_none());
        assert!(json.get("apiKeyReadOnly").is_some());
    }

    #[test]
    fn no_access_suppresses_both_keys() {
        let json =
            serde_json::to_value(FeedResponse::for_level(feed(), AccessLevel::None)).unwrap();
        assert!(json.get("apiKey").is_none());
        assert!(json.get("apiKeyReadOnly").is_none());
    }
}
