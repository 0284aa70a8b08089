use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered OAuth2 application (e.g. a specific front end).
/// Identified by its unique `client_name`; immutable once created.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub display_name: String,
    pub client_name: String,
    pub client_secret: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: i64,
    pub display_name: String,
    pub client_name: String,
}

impl From<Client> for ClientResponse {
    fn from(c: Client) -> Self {
        Self {
            id: c.id,
            display_name: c.display_name,
            client_name: c.client_name,
        }
    }
}
