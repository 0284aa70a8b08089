//! Background job: purge idle browser sessions.
//!
//! Runs hourly. Token rows are deliberately left alone: refresh tokens
//! carry no expiry, so an expired access token's row must survive for its
//! refresh token to stay usable.

use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::store::PgStore;

/// Sessions untouched for this long are dropped.
const IDLE_SESSION_RETENTION_DAYS: i64 = 30;

/// Spawn the background cleanup task. Call this once at startup.
pub fn spawn(db: PgStore) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = purge_idle_sessions(&db).await {
                tracing::error!("session cleanup failed: {:#}", e);
            }
        }
    });
}

async fn purge_idle_sessions(db: &PgStore) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(IDLE_SESSION_RETENTION_DAYS);
    let purged = db.purge_idle_sessions(cutoff).await?;
    if purged > 0 {
        tracing::info!(rows = purged, "purged idle sessions");
    }
    Ok(())
}
