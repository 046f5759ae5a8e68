//! Expiring key-value storage for lockout counters, the refresh registry and the blacklist.
//!
//! Every entry written through [`KeyValueStore`] carries a TTL; nothing in the
//! service sweeps expired state, the store drops it on its own.

use async_trait::async_trait;
use redis::{Client, Script, aio::ConnectionManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info_span};

// INCR and the first EXPIRE must land together, otherwise a crash in between
// leaves a counter that never expires.
const INCREMENT_WITH_TTL_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("value at {0} is not an integer")]
    NotAnInteger(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value and expiry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically add one to the counter at `key` and return the new count.
    ///
    /// A missing counter is created with `ttl`; existing counters keep their expiry.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Store TTLs have one-second resolution and zero would mean "no expiry".
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis-backed store shared by every service instance.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
    increment_script: Script,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection_manager = ConnectionManager::new(client).await.map_err(|err| {
            error!("Failed to create Redis connection manager: {err}");
            err
        })?;

        let store = Self {
            connection_manager,
            increment_script: Script::new(INCREMENT_WITH_TTL_SCRIPT),
        };
        store.ping().await?;

        debug!("Connected to Redis");

        Ok(store)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection_manager.clone();
        let span = info_span!("redis.command", db.system = "redis", db.operation = "GET");
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .instrument(span)
            .await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        let span = info_span!("redis.command", db.system = "redis", db.operation = "SET");
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async::<()>(&mut conn)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection_manager.clone();
        let span = info_span!("redis.command", db.system = "redis", db.operation = "EVALSHA");
        let count: i64 = self
            .increment_script
            .key(key)
            .arg(ttl_seconds(ttl))
            .invoke_async(&mut conn)
            .instrument(span)
            .await?;
        u64::try_from(count).map_err(|_| StoreError::NotAnInteger(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        let span = info_span!("redis.command", db.system = "redis", db.operation = "DEL");
        redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection_manager.clone();
        let span = info_span!("redis.command", db.system = "redis", db.operation = "EXISTS");
        let found: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .instrument(span)
            .await?;
        Ok(found > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

// stand-in expiry for TTLs too large for the clock
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store with the same TTL semantics as [`RedisStore`].
///
/// Expiry follows `tokio::time`, so tests can pause and advance the clock.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away; every operation fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    fn expiry(ttl: Duration) -> Instant {
        let now = Instant::now();
        now.checked_add(Duration::from_secs(ttl_seconds(ttl)))
            .unwrap_or_else(|| now + FAR_FUTURE)
    }
}

fn purge_expired(entries: &mut HashMap<String, MemoryEntry>, key: &str) {
    if entries
        .get(key)
        .is_some_and(|entry| entry.expires_at <= Instant::now())
    {
        entries.remove(key);
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key);
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Self::expiry(ttl),
            },
        );
        Ok(())
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key);
        if let Some(entry) = entries.get_mut(key) {
            let count = entry
                .value
                .parse::<u64>()
                .map_err(|_| StoreError::NotAnInteger(key.to_string()))?
                + 1;
            entry.value = count.to_string();
            return Ok(count);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: "1".to_string(),
                expires_at: Self::expiry(ttl),
            },
        );
        Ok(1)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key);
        Ok(entries.contains_key(key))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_with_ttl_expires() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store
            .set_with_ttl("blacklist:t", "1", Duration::from_secs(10))
            .await?;
        assert_eq!(store.get("blacklist:t").await?, Some("1".to_string()));
        assert!(store.exists("blacklist:t").await?);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("blacklist:t").await?, None);
        assert!(!store.exists("blacklist:t").await?);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn increment_keeps_first_expiry() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(store.increment_with_ttl("login_attempts:a", ttl).await?, 1);

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(store.increment_with_ttl("login_attempts:a", ttl).await?, 2);
        let remaining = store
            .remaining_ttl("login_attempts:a")
            .await
            .unwrap_or_default();
        assert!(remaining <= Duration::from_secs(20) && remaining > Duration::from_secs(19));

        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(store.increment_with_ttl("login_attempts:a", ttl).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn increment_rejects_non_integer_values() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "not-a-number", Duration::from_secs(5))
            .await?;
        let result = store.increment_with_ttl("k", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(StoreError::NotAnInteger(_))));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() -> Result<(), StoreError> {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .increment_with_ttl("login_attempts:race", Duration::from_secs(60))
                    .await
            }));
        }
        for task in tasks {
            let joined = task
                .await
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            joined?;
        }
        assert_eq!(store.get("login_attempts:race").await?, Some("20".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn offline_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.ping().await.is_err());
        assert!(store.exists("k").await.is_err());
        assert!(store.get("k").await.is_err());
        assert!(
            store
                .increment_with_ttl("k", Duration::from_secs(1))
                .await
                .is_err()
        );

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[test]
    fn ttl_never_rounds_down_to_zero() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(900)), 900);
    }
}
