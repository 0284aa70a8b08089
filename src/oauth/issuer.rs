use chrono::{Duration, Utc};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::models::client::Client;
use crate::models::token::{NewToken, Token};
use crate::store::CredentialStore;

use super::GrantError;

/// Mint and rotate OAuth2 token pairs, and validate bearer tokens.
///
/// Tokens are opaque 64-hex strings backed by rows in the Credential Store;
/// validity is row existence plus an unexpired access timestamp. Validation
/// never renews anything.
#[derive(Debug, Clone)]
pub struct Issuer {
    access_token_lifetime_secs: i64,
}

impl Issuer {
    pub fn new(access_token_lifetime_secs: i64) -> Self {
        Self {
            access_token_lifetime_secs,
        }
    }

    /// Reported as `expires_in` at mint time.
    pub fn access_token_lifetime_secs(&self) -> i64 {
        self.access_token_lifetime_secs
    }

    /// OAuth2 `password` grant: client credentials, then resource owner
    /// credentials, then a fresh pair.
    pub async fn password_grant(
        &self,
        store: &dyn CredentialStore,
        client_name: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Result<Token, GrantError> {
        let client = self
            .authenticate_client(store, client_name, client_secret)
            .await?;

        let user = store
            .find_user_by_email(username)
            .await?
            .ok_or(GrantError::InvalidResourceOwner)?;

        if !bcrypt::verify(password, &user.password).unwrap_or(false) {
            return Err(GrantError::InvalidResourceOwner);
        }

        let token = store.insert_token(&self.mint(client.id, user.id)).await?;
        Ok(token)
    }

    /// OAuth2 `refresh_token` grant. The presented refresh token is
    /// single-use: rotation deletes its row and inserts the replacement in
    /// one atomic step, so a concurrent second use loses with
    /// `invalid_grant`. A real refresh token presented by the wrong client
    /// is an `invalid_client` failure, not `invalid_grant`.
    pub async fn refresh_grant(
        &self,
        store: &dyn CredentialStore,
        client_name: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<Token, GrantError> {
        let client = self
            .authenticate_client(store, client_name, client_secret)
            .await?;

        let old = store
            .find_token_by_refresh(refresh_token)
            .await?
            .ok_or(GrantError::InvalidGrant)?;

        if old.client_id != client.id {
            return Err(GrantError::InvalidClient);
        }

        let new = self.mint(old.client_id, old.user_id);
        match store.rotate_token(refresh_token, &new).await? {
            Some(token) => Ok(token),
            // Lost the race: someone else rotated this token first.
            None => Err(GrantError::InvalidGrant),
        }
    }

    /// Bearer validation: the row must exist and be strictly unexpired.
    /// Expired-but-present is identical to absent.
    pub async fn validate_access_token(
        &self,
        store: &dyn CredentialStore,
        access_token: &str,
    ) -> anyhow::Result<Option<Token>> {
        let token = store.find_token_by_access(access_token).await?;
        Ok(token.filter(|t| !t.is_expired_at(Utc::now())))
    }

    async fn authenticate_client(
        &self,
        store: &dyn CredentialStore,
        client_name: &str,
        client_secret: &str,
    ) -> Result<Client, GrantError> {
        let client = store
            .find_client_by_name(client_name)
            .await?
            .ok_or(GrantError::InvalidClient)?;

        if !secrets_match(&client.client_secret, client_secret) {
            return Err(GrantError::InvalidClient);
        }
        Ok(client)
    }

    fn mint(&self, client_id: i64, user_id: i64) -> NewToken {
        NewToken {
            access_token: random_hex64(),
            access_token_expires: Utc::now()
                + Duration::seconds(self.access_token_lifetime_secs),
            refresh_token: random_hex64(),
            client_id,
            user_id,
        }
    }
}

/// 32 random bytes as 64 lowercase hex characters.
pub fn random_hex64() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn secrets_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_and_distinct() {
        let a = random_hex64();
        let b = random_hex64();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn secret_comparison_rejects_mismatch_and_prefix() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3cre"));
        assert!(!secrets_match("s3cret", "s3cret "));
        assert!(!secrets_match("s3cret", ""));
    }

    #[test]
    fn minted_pair_uses_the_configured_lifetime() {
        let issuer = Issuer::new(3600);
        let before = Utc::now();
        let minted = issuer.mint(1, 2);
        let after = Utc::now();

        assert!(minted.access_token_expires >= before + Duration::seconds(3600));
        assert!(minted.access_token_expires <= after + Duration::seconds(3600));
        assert_ne!(minted.access_token, minted.refresh_token);
        assert_eq!(minted.client_id, 1);
        assert_eq!(minted.user_id, 2);
    }
}
