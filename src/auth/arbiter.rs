use axum::http::StatusCode;

use crate::errors::AppError;
use crate::models::feed::Feed;

use super::resolver::Resolved;

/// The ceiling of operations a resolved credential permits on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    None,
    ReadOnly,
    ReadWrite,
}

/// The identity behind an allowed request. A feed key carries no user
/// identity; it is its own principal, scoped to exactly one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    None,
    User(i64),
    FeedKey { feed_id: i64 },
}

/// An ALLOW outcome: what the caller may do and as whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedAccess {
    pub level: AccessLevel,
    pub principal: Principal,
}

/// A DENY outcome. 401 is reserved for "absolutely no credential was
/// presented"; everything presented-but-wrong is 403. Unknown resources
/// (404) never reach the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoCredential,
    Forbidden,
}

impl Denial {
    pub fn status(self) -> StatusCode {
        match self {
            Denial::NoCredential => StatusCode::UNAUTHORIZED,
            Denial::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NoCredential => AppError::NoCredential,
            Denial::Forbidden => AppError::Forbidden,
        }
    }
}

/// The level a resolved credential earns on `feed`, before the route's
/// requirement is considered.
///
/// A public feed grants its read-only view to everyone, including callers
/// holding invalid material or a key for some other feed; their material is
/// simply irrelevant to the public view, and they get no principal with it.
pub fn granted(feed: &Feed, resolved: &Resolved) -> FeedAccess {
    let public_view = |level| FeedAccess {
        level,
        principal: Principal::None,
    };

    match resolved {
        Resolved::NoCredential | Resolved::PresentedInvalid => {
            if feed.is_public {
                public_view(AccessLevel::ReadOnly)
            } else {
                public_view(AccessLevel::None)
            }
        }

        Resolved::User(user_id) => {
            let level = if feed.is_owned_by(*user_id) {
                AccessLevel::ReadWrite
            } else if feed.is_public {
                AccessLevel::ReadOnly
            } else {
                AccessLevel::None
            };
            FeedAccess {
                level,
                principal: Principal::User(*user_id),
            }
        }

        Resolved::FeedKeyFor { feed_id, level } => {
            if *feed_id == feed.id {
                FeedAccess {
                    level: *level,
                    principal: Principal::FeedKey { feed_id: *feed_id },
                }
            } else if feed.is_public {
                // A key for a different feed unlocks nothing here; the
                // public view owes nothing to it.
                public_view(AccessLevel::ReadOnly)
            } else {
                public_view(AccessLevel::None)
            }
        }
    }
}

/// The full decision: grant a level, then hold it against the route's
/// requirement. Denial is 401 only when no credential material was
/// presented at all.
pub fn decide(
    feed: &Feed,
    resolved: &Resolved,
    required: AccessLevel,
) -> Result<FeedAccess, Denial> {
    let access = granted(feed, resolved);
    if access.level >= required {
        return Ok(access);
    }
    match resolved {
        Resolved::NoCredential => Err(Denial::NoCredential),
        _ => Err(Denial::Forbidden),
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const OWNER: i64 = 10;
    const STRANGER: i64 = 20;

    fn feed(id: i64, is_public: bool) -> Feed {
        Feed {
            id,
            name: format!("feed-{id}"),
            user_id: OWNER,
            api_key: "a".repeat(64),
            api_key_read_only: "b".repeat(64),
            is_public,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    fn own_key(feed: &Feed, level: AccessLevel) -> Resolved {
        Resolved::FeedKeyFor {
            feed_id: feed.id,
            level,
        }
    }

    #[test]
    fn public_feed_grants_read_only_view_without_credential() {
        let f = feed(1, true);
        let access = decide(&f, &Resolved::NoCredential, AccessLevel::ReadOnly).unwrap();
        assert_eq!(access.level, AccessLevel::ReadOnly);
        assert_eq!(access.principal, Principal::None);
    }

    #[test]
    fn private_feed_without_credential_is_401() {
        let f = feed(1, false);
        let denial = decide(&f, &Resolved::NoCredential, AccessLevel::ReadOnly).unwrap_err();
        assert_eq!(denial, Denial::NoCredential);
        assert_eq!(denial.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn private_feed_with_invalid_credential_is_403() {
        let f = feed(1, false);
        let denial =
            decide(&f, &Resolved::PresentedInvalid, AccessLevel::ReadOnly).unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
        assert_eq!(denial.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn public_feed_with_invalid_credential_still_gets_the_view() {
        let f = feed(1, true);
        let access = decide(&f, &Resolved::PresentedInvalid, AccessLevel::ReadOnly).unwrap();
        assert_eq!(access.level, AccessLevel::ReadOnly);
        assert_eq!(access.principal, Principal::None);
    }

    #[test]
    fn owner_gets_read_write_on_private_feed() {
        let f = feed(1, false);
        let access = decide(&f, &Resolved::User(OWNER), AccessLevel::ReadWrite).unwrap();
        assert_eq!(access.level, AccessLevel::ReadWrite);
        assert_eq!(access.principal, Principal::User(OWNER));
    }

    #[test]
    fn owner_gets_read_write_on_public_feed() {
        let f = feed(1, true);
        let access = decide(&f, &Resolved::User(OWNER), AccessLevel::ReadOnly).unwrap();
        assert_eq!(access.level, AccessLevel::ReadWrite);
    }

    #[test]
    fn non_owner_on_private_feed_is_403() {
        let f = feed(1, false);
        let denial = decide(&f, &Resolved::User(STRANGER), AccessLevel::ReadOnly).unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[test]
    fn non_owner_on_public_feed_reads_but_cannot_write() {
        let f = feed(1, true);
        let access = decide(&f, &Resolved::User(STRANGER), AccessLevel::ReadOnly).unwrap();
        assert_eq!(access.level, AccessLevel::ReadOnly);

        let denial = decide(&f, &Resolved::User(STRANGER), AccessLevel::ReadWrite).unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[test]
    fn read_only_key_grants_read_only_even_on_private_feed() {
        let f = feed(1, false);
        let access = decide(&f, &own_key(&f, AccessLevel::ReadOnly), AccessLevel::ReadOnly)
            .unwrap();
        assert_eq!(access.level, AccessLevel::ReadOnly);
        assert_eq!(access.principal, Principal::FeedKey { feed_id: 1 });
    }

    #[test]
    fn read_only_key_cannot_write() {
        let f = feed(1, false);
        let denial = decide(&f, &own_key(&f, AccessLevel::ReadOnly), AccessLevel::ReadWrite)
            .unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[test]
    fn read_write_key_grants_read_write_on_private_feed() {
        let f = feed(1, false);
        let access = decide(&f, &own_key(&f, AccessLevel::ReadWrite), AccessLevel::ReadWrite)
            .unwrap();
        assert_eq!(access.level, AccessLevel::ReadWrite);
    }

    #[test]
    fn key_for_another_feed_gets_the_public_view_only() {
        let f = feed(1, true);
        let other = Resolved::FeedKeyFor {
            feed_id: 2,
            level: AccessLevel::ReadWrite,
        };
        let access = decide(&f, &other, AccessLevel::ReadOnly).unwrap();
        assert_eq!(access.level, AccessLevel::ReadOnly);
        assert_eq!(access.principal, Principal::None);
    }

    #[test]
    fn key_for_another_feed_is_403_on_private_feed() {
        let f = feed(1, false);
        let other = Resolved::FeedKeyFor {
            feed_id: 2,
            level: AccessLevel::ReadWrite,
        };
        let denial = decide(&f, &other, AccessLevel::ReadOnly).unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[test]
    fn write_requires_more_than_the_public_view() {
        let f = feed(1, true);
        // No credential at all: the missing-credential denial wins (401).
        let denial = decide(&f, &Resolved::NoCredential, AccessLevel::ReadWrite).unwrap_err();
        assert_eq!(denial, Denial::NoCredential);
        // Presented-but-useless material: 403.
        let denial =
            decide(&f, &Resolved::PresentedInvalid, AccessLevel::ReadWrite).unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[test]
    fn access_levels_are_ordered() {
        assert!(AccessLevel::ReadWrite > AccessLevel::ReadOnly);
        assert!(AccessLevel::ReadOnly > AccessLevel::None);
    }
}
