use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::session::SessionAuth;

/// Header carrying a feed-scoped API key.
pub const FEED_API_KEY_HEADER: &str = "feedapikey";

/// Feed API keys are 64 lowercase hex characters.
static FEED_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("valid regex"));

/// Where a feed key was presented. A path-segment key that matches no feed
/// is indistinguishable from an unknown resource; a header key that matches
/// no feed is a wrong credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    Header,
    Path,
}

/// The credential material of a request, resolved once before any
/// authorization logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Session { user_id: i64 },
    Bearer(String),
    FeedKey { key: String, placement: KeyPlacement },
}

/// The path segment of a feed route: a numeric feed id, or one of the
/// feed's API keys in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedIdentifier {
    Id(i64),
    Key(String),
}

impl FeedIdentifier {
    /// `None` means the segment is neither an id nor key-shaped: an
    /// unknown resource (404), decided before authorization.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse::<i64>().ok().map(FeedIdentifier::Id);
        }
        if FEED_KEY_RE.is_match(raw) {
            return Some(FeedIdentifier::Key(raw.to_string()));
        }
        None
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn feed_key_header(headers: &HeaderMap) -> Option<String> {
    let key = headers.get(FEED_API_KEY_HEADER)?.to_str().ok()?.trim();
    (!key.is_empty()).then(|| key.to_string())
}

impl Credential {
    /// Credential for a feed-scoped route, in priority order: `FeedApiKey`
    /// header, the path segment itself as a key, session, bearer token.
    pub fn for_feed_request(
        headers: &HeaderMap,
        identifier: &FeedIdentifier,
        session: Option<&SessionAuth>,
    ) -> Credential {
        if let Some(key) = feed_key_header(headers) {
            return Credential::FeedKey {
                key,
                placement: KeyPlacement::Header,
            };
        }
        if let FeedIdentifier::Key(key) = identifier {
            return Credential::FeedKey {
                key: key.clone(),
                placement: KeyPlacement::Path,
            };
        }
        if let Some(auth) = session {
            return Credential::Session {
                user_id: auth.user_id,
            };
        }
        match bearer_token(headers) {
            Some(token) => Credential::Bearer(token),
            None => Credential::None,
        }
    }

    /// Credential for routes that require a user principal: session first
    /// (where session middleware is active), else bearer.
    pub fn for_user_request(headers: &HeaderMap, session: Option<&SessionAuth>) -> Credential {
        if let Some(auth) = session {
            return Credential::Session {
                user_id: auth.user_id,
            };
        }
        match bearer_token(headers) {
            Some(token) => Credential::Bearer(token),
            None => Credential::None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
