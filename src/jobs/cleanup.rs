//! Background job: notification retention.
//!
//! Runs hourly. Deletes read notifications older than the configured
//! retention window and sweeps expired local cache entries. Unread
//! notifications are never expired.

use std::time::Duration;

use tokio::time;

use crate::cache::TieredCache;
use crate::store::postgres::PgStore;

/// Spawn the retention task. Call this once at startup.
pub fn spawn(db: PgStore, cache: TieredCache, retention_days: u32) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;

            match db.purge_read_notifications(retention_days).await {
                Ok(0) => {}
                Ok(purged) => {
                    tracing::info!(rows = purged, "purged expired read notifications");
                }
                Err(e) => {
                    tracing::error!("notification retention job failed: {}", e);
                }
            }

            let evicted = cache.evict_expired();
            if evicted > 0 {
                tracing::debug!(entries = evicted, "evicted expired local cache entries");
            }
        }
    });
}
