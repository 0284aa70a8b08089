//! In-memory `CredentialStore` / `FeedIndex` used by the integration tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use feedstore::models::client::Client;
use feedstore::models::feed::Feed;
use feedstore::models::token::{NewToken, Token};
use feedstore::models::user::User;
use feedstore::oauth::issuer::random_hex64;
use feedstore::store::{CredentialStore, FeedIndex};

/// Low bcrypt cost keeps the test suite fast; never do this in production.
pub const TEST_BCRYPT_COST: u32 = 4;

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    clients: Vec<Client>,
    users: Vec<User>,
    tokens: Vec<Token>,
    feeds: Vec<Feed>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, client_name: &str, client_secret: &str) -> Client {
        let mut inner = self.inner.lock().unwrap();
        let client = Client {
            id: inner.next_id(),
            display_name: format!("{client_name} (test)"),
            client_name: client_name.to_string(),
            client_secret: client_secret.to_string(),
            created: Utc::now(),
        };
        inner.clients.push(client.clone());
        client
    }

    pub fn add_user(&self, email: &str, password: &str) -> User {
        let mut inner = self.inner.lock().unwrap();
        let user = User {
            id: inner.next_id(),
            email: email.to_string(),
            password: bcrypt::hash(password, TEST_BCRYPT_COST).unwrap(),
            display_name: None,
            created: Utc::now(),
            modified: Utc::now(),
        };
        inner.users.push(user.clone());
        user
    }

    #[allow(dead_code)] // not every test binary creates feeds
    pub fn add_feed(&self, user_id: i64, is_public: bool) -> Feed {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let feed = Feed {
            id,
            name: format!("feed-{id}"),
            user_id,
            api_key: random_hex64(),
            api_key_read_only: random_hex64(),
            is_public,
            created: Utc::now(),
            modified: Utc::now(),
        };
        inner.feeds.push(feed.clone());
        feed
    }

    #[allow(dead_code)] // not every test binary counts tokens
    pub fn token_count(&self) -> usize {
        self.inner.lock().unwrap().tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemStore {
    async fn find_client_by_name(&self, client_name: &str) -> anyhow::Result<Option<Client>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .clients
            .iter()
            .find(|c| c.client_name == client_name)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_token(&self, new: &NewToken) -> anyhow::Result<Token> {
        let mut inner = self.inner.lock().unwrap();
        let token = Token {
            id: inner.next_id(),
            access_token: new.access_token.clone(),
            access_token_expires: new.access_token_expires,
            refresh_token: new.refresh_token.clone(),
            client_id: new.client_id,
            user_id: new.user_id,
            created: Utc::now(),
        };
        inner.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_token_by_access(&self, access_token: &str) -> anyhow::Result<Option<Token>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .iter()
            .find(|t| t.access_token == access_token)
            .cloned())
    }

    async fn find_token_by_refresh(&self, refresh_token: &str) -> anyhow::Result<Option<Token>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .iter()
            .find(|t| t.refresh_token == refresh_token)
            .cloned())
    }

    async fn rotate_token(
        &self,
        old_refresh: &str,
        new: &NewToken,
    ) -> anyhow::Result<Option<Token>> {
        // One lock held across delete + insert: the same atomicity the
        // Postgres implementation gets from its transaction.
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner
            .tokens
            .iter()
            .position(|t| t.refresh_token == old_refresh)
        else {
            return Ok(None);
        };
        inner.tokens.remove(pos);
        let token = Token {
            id: inner.next_id(),
            access_token: new.access_token.clone(),
            access_token_expires: new.access_token_expires,
            refresh_token: new.refresh_token.clone(),
            client_id: new.client_id,
            user_id: new.user_id,
            created: Utc::now(),
        };
        inner.tokens.push(token.clone());
        Ok(Some(token))
    }

    async fn delete_token_by_access(&self, access_token: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner.tokens.retain(|t| t.access_token != access_token);
        Ok(inner.tokens.len() < before)
    }
}

#[async_trait]
impl FeedIndex for MemStore {
    async fn find_feed_by_id(&self, id: i64) -> anyhow::Result<Option<Feed>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.feeds.iter().find(|f| f.id == id).cloned())
    }

    async fn find_feed_by_key(&self, key: &str) -> anyhow::Result<Option<Feed>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .feeds
            .iter()
            .find(|f| f.api_key == key || f.api_key_read_only == key)
            .cloned())
    }
}
