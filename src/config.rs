use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Name of the browser session cookie.
    pub cookie_name: String,
    /// Whether to mark the session cookie Secure (must be true behind HTTPS).
    pub cookie_secure: bool,
    /// Access token lifetime in seconds. Default: 3600.
    pub access_token_lifetime_secs: i64,
    /// A session's access token is refreshed in-band once its remaining
    /// lifetime drops to this many seconds. Default: 300.
    pub refresh_threshold_secs: i64,
    /// OAuth2 client the web front end authenticates under. Login and the
    /// session refresh interceptor issue grants with these credentials.
    pub web_client_name: String,
    pub web_client_secret: String,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let web_client_secret = std::env::var("FEEDSTORE_WEB_CLIENT_SECRET")
        .unwrap_or_else(|_| "CHANGE_ME_WEB_CLIENT_SECRET".into());

    if web_client_secret == "CHANGE_ME_WEB_CLIENT_SECRET" {
        let env_mode = std::env::var("FEEDSTORE_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "FEEDSTORE_WEB_CLIENT_SECRET is still the insecure placeholder. \
                 Set a proper secret before running in production."
            );
        }
        eprintln!(
            "⚠️  FEEDSTORE_WEB_CLIENT_SECRET is not set; using insecure placeholder."
        );
    }

    Ok(Config {
        port: std::env::var("FEEDSTORE_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/feedstore".into()),
        cookie_name: std::env::var("FEEDSTORE_COOKIE_NAME")
            .unwrap_or_else(|_| "feedstore.sid".into()),
        cookie_secure: std::env::var("FEEDSTORE_COOKIE_SECURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false),
        access_token_lifetime_secs: std::env::var("FEEDSTORE_TOKEN_LIFETIME_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600),
        refresh_threshold_secs: std::env::var("FEEDSTORE_REFRESH_THRESHOLD_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        web_client_name: std::env::var("FEEDSTORE_WEB_CLIENT_NAME")
            .unwrap_or_else(|_| "feedstore-web".into()),
        web_client_secret,
    })
}
