//! Expiring key/value store for verification codes.
//!
//! Redis in production (`SET .. EX`, compare-and-delete script); an
//! in-process map when no Redis URL is configured.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::MailError;

/// Deletes KEYS[1] only if it holds ARGV[1]. Returns 1 on delete.
const CONSUME_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

#[derive(Clone)]
pub enum CodeCache {
    Redis(RedisCodeCache),
    Memory(MemoryCodeCache),
    /// Fails every call, like a Redis that has gone away.
    #[cfg(any(test, feature = "test-utils"))]
    Unavailable,
}

impl CodeCache {
    /// Connect to Redis when a URL is given, otherwise fall back to memory.
    pub async fn connect(redis_url: Option<&str>) -> Result<Self, MailError> {
        match redis_url {
            Some(url) => Ok(Self::Redis(RedisCodeCache::new(url).await?)),
            None => {
                warn!("No Redis URL configured, verification codes are kept in process memory");
                Ok(Self::Memory(MemoryCodeCache::new()))
            }
        }
    }

    pub async fn store(&self, key: &str, code: &str, ttl: Duration) -> Result<(), MailError> {
        match self {
            Self::Redis(c) => c.store(key, code, ttl).await,
            Self::Memory(c) => {
                c.store(key, code, ttl).await;
                Ok(())
            }
            #[cfg(any(test, feature = "test-utils"))]
            Self::Unavailable => Err(unavailable()),
        }
    }

    /// Remove `key` if, and only if, it currently holds `code`. Returns
    /// whether a live matching code was consumed.
    pub async fn consume_if_matches(&self, key: &str, code: &str) -> Result<bool, MailError> {
        match self {
            Self::Redis(c) => c.consume_if_matches(key, code).await,
            Self::Memory(c) => Ok(c.consume_if_matches(key, code).await),
            #[cfg(any(test, feature = "test-utils"))]
            Self::Unavailable => Err(unavailable()),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
fn unavailable() -> MailError {
    MailError::CacheUnavailable("cache is offline".into())
}

#[derive(Clone)]
pub struct RedisCodeCache {
    conn_manager: ConnectionManager,
    consume: Arc<Script>,
}

impl RedisCodeCache {
    pub async fn new(redis_url: &str) -> Result<Self, MailError> {
        let client = Client::open(redis_url)
            .map_err(|e| MailError::CacheUnavailable(format!("invalid Redis URL: {e}")))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| MailError::CacheUnavailable(format!("Redis connection failed: {e}")))?;

        info!("Verification code cache connected to Redis");
        Ok(Self {
            conn_manager,
            consume: Arc::new(Script::new(CONSUME_SCRIPT)),
        })
    }

    async fn store(&self, key: &str, code: &str, ttl: Duration) -> Result<(), MailError> {
        let mut conn = self.conn_manager.clone();
        let ttl_seconds = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(key, code, ttl_seconds)
            .await
            .map_err(|e| MailError::CacheUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn consume_if_matches(&self, key: &str, code: &str) -> Result<bool, MailError> {
        let mut conn = self.conn_manager.clone();
        let deleted: i64 = self
            .consume
            .key(key)
            .arg(code)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| MailError::CacheUnavailable(e.to_string()))?;
        Ok(deleted == 1)
    }
}

/// In-process expiring map. Expired entries are invisible immediately and
/// reclaimed by [`MemoryCodeCache::prune`].
#[derive(Clone, Default)]
pub struct MemoryCodeCache {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn store(&self, key: &str, code: &str, ttl: Duration) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (code.to_string(), Instant::now() + ttl));
    }

    async fn consume_if_matches(&self, key: &str, code: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let Some((stored, expires_at)) = entries.get(key) else {
            return false;
        };

        if *expires_at <= Instant::now() {
            entries.remove(key);
            return false;
        }

        let matches = constant_time_eq::constant_time_eq(stored.as_bytes(), code.as_bytes());
        if matches {
            entries.remove(key);
        }
        matches
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }

    /// Background loop calling [`prune`](Self::prune) on an interval.
    pub async fn run_prune_loop(self, every: Duration) {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = self.prune().await;
            if removed > 0 {
                info!("Pruned {} expired verification codes", removed);
            }
        }
    }
}
