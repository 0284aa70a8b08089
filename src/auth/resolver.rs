use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::feed::Feed;
use crate::oauth::issuer::Issuer;
use crate::store::{CredentialStore, FeedIndex};

use super::arbiter::AccessLevel;
use super::credential::Credential;
use super::session::SessionAuth;

/// What a request's credential material resolved to.
///
/// Missing material and presented-but-wrong material are kept apart here:
/// the arbiter needs the distinction to pick 401 vs 403 on private feeds.
/// A bad bearer or an unknown header key is `PresentedInvalid`, never
/// silently `NoCredential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    NoCredential,
    User(i64),
    FeedKeyFor { feed_id: i64, level: AccessLevel },
    PresentedInvalid,
}

/// The access level a presented key grants on the feed it belongs to.
/// The caller guarantees `feed` was found by this key.
pub fn key_level(feed: &Feed, key: &str) -> AccessLevel {
    if bool::from(key.as_bytes().ct_eq(feed.api_key.as_bytes())) {
        AccessLevel::ReadWrite
    } else {
        AccessLevel::ReadOnly
    }
}

/// Resolve a feed-route credential into a principal. One store round-trip
/// at most; every outcome is a value, not an error.
pub async fn resolve_feed_credential(
    store: &dyn CredentialStore,
    feeds: &dyn FeedIndex,
    issuer: &Issuer,
    credential: &Credential,
) -> anyhow::Result<Resolved> {
    match credential {
        Credential::None => Ok(Resolved::NoCredential),

        Credential::Session { user_id } => Ok(Resolved::User(*user_id)),

        Credential::Bearer(token) => {
            match issuer.validate_access_token(store, token).await? {
                Some(token) => Ok(Resolved::User(token.user_id)),
                None => Ok(Resolved::PresentedInvalid),
            }
        }

        Credential::FeedKey { key, .. } => match feeds.find_feed_by_key(key).await? {
            Some(feed) => Ok(Resolved::FeedKeyFor {
                feed_id: feed.id,
                level: key_level(&feed, key),
            }),
            None => Ok(Resolved::PresentedInvalid),
        },
    }
}

/// Resolve an optional user principal for routes that only care about user
/// identity (collections, signup-adjacent routes). Missing and invalid
/// credentials both come back as `None`; on these routes the denial is
/// 401 either way.
pub async fn resolve_user_principal(
    store: &dyn CredentialStore,
    issuer: &Issuer,
    headers: &HeaderMap,
    session: Option<&SessionAuth>,
) -> anyhow::Result<Option<i64>> {
    match Credential::for_user_request(headers, session) {
        Credential::Session { user_id } => Ok(Some(user_id)),
        Credential::Bearer(token) => Ok(issuer
            .validate_access_token(store, &token)
            .await?
            .map(|t| t.user_id)),
        _ => Ok(None),
    }
}

/// Like [`resolve_user_principal`] but denies with 401 when no user
/// principal could be established.
pub async fn require_user_principal(
    store: &dyn CredentialStore,
    issuer: &Issuer,
    headers: &HeaderMap,
    session: Option<&SessionAuth>,
) -> Result<i64, AppError> {
    resolve_user_principal(store, issuer, headers, session)
        .await?
        .ok_or(AppError::NoCredential)
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feed_with_keys(rw: &str, ro: &str) -> Feed {
        Feed {
            id: 1,
            name: "f".into(),
            user_id: 1,
            api_key: rw.to_string(),
            api_key_read_only: ro.to_string(),
            is_public: true,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn write_key_resolves_to_read_write() {
        let rw = "a".repeat(64);
        let ro = "b".repeat(64);
        let feed = feed_with_keys(&rw, &ro);
        assert_eq!(key_level(&feed, &rw), AccessLevel::ReadWrite);
    }

    #[test]
    fn read_key_resolves_to_read_only() {
        let rw = "a".repeat(64);
        let ro = "b".repeat(64);
        let feed = feed_with_keys(&rw, &ro);
        assert_eq!(key_level(&feed, &ro), AccessLevel::ReadOnly);
    }
}
