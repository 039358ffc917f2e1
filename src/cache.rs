use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

/// Entry stored in the local map with an expiry timestamp.
#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Two-tier cache: in-memory DashMap (tier 1) backed by Redis (tier 2).
/// Postgres is the source of truth; this only holds cheap derived values
/// (unread counts) and the login-attempt counters.
///
/// Local entries honour TTLs: checked on read, evicted lazily.
#[derive(Clone)]
pub struct TieredCache {
    local: Arc<DashMap<String, CacheEntry>>,
    redis: ConnectionManager,
}

impl TieredCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            local: Arc::new(DashMap::new()),
            redis,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(entry) = self.local.get(key) {
            if Instant::now() < entry.expires_at {
                return serde_json::from_str(&entry.value).ok();
            }
            drop(entry);
            self.local.remove(key);
        }

        let mut conn = self.redis.clone();
        if let Ok(Some(v)) = conn.get::<_, Option<String>>(key).await {
            let ttl_secs: i64 = conn.ttl(key).await.unwrap_or(30);
            let ttl = if ttl_secs > 0 {
                Duration::from_secs(ttl_secs as u64)
            } else {
                Duration::from_secs(30)
            };
            self.local.insert(
                key.to_string(),
                CacheEntry {
                    value: v.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
            return serde_json::from_str(&v).ok();
        }

        None
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> anyhow::Result<()> {
        let json = serde_json::to_string(value)?;
        self.local.insert(
            key.to_string(),
            CacheEntry {
                value: json.clone(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, json, ttl_secs).await?;
        Ok(())
    }

    /// Drop a key from both tiers. Used when the underlying row changes
    /// (new notification, mark-read) so stale counts never outlive a write.
    pub async fn invalidate(&self, key: &str) {
        self.local.remove(key);
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("cache invalidate failed for {}: {}", key, e);
        }
    }

    /// Read a counter written by [`increment`](Self::increment). Goes to
    /// Redis directly: counters change behind the local tier's back, so a
    /// tier-1 copy would under-count.
    pub async fn counter(&self, key: &str) -> anyhow::Result<u64> {
        let mut conn = self.redis.clone();
        let value: Option<u64> = conn.get(key).await?;
        Ok(value.unwrap_or(0))
    }

    /// Atomic INCR with expiry on first increment. Returns the new count.
    pub async fn increment(&self, key: &str, window_secs: u64) -> anyhow::Result<u64> {
        let mut conn = self.redis.clone();
        let script = redis::Script::new(
            r#"
            local current = redis.call("INCR", KEYS[1])
            if current == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return current
            "#,
        );
        let count: u64 = script
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    /// Remove all locally-expired entries. Called periodically from the
    /// cleanup job to bound memory usage.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.local.len();
        self.local.retain(|_, entry| entry.expires_at > now);
        before - self.local.len()
    }
}

/// Cache key for a user's unread-notification count.
pub fn unread_count_key(user_id: uuid::Uuid) -> String {
    format!("unread:{}", user_id)
}

/// Counter key for failed logins per email.
pub fn login_attempts_key(email: &str) -> String {
    format!("login_attempts:{}", email.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            unread_count_key(id),
            "unread:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(login_attempts_key("A@B.com"), "login_attempts:a@b.com");
    }
}
