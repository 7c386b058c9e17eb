//! Redis-based cache backend.

use crate::availability::AvailabilityGuard;
use crate::backend::CacheBackend;
use crate::error::{CacheError, CacheResult};
use crate::supervisor::SupervisedBackend;
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Keys requested per `SCAN` round trip during pattern deletion.
const SCAN_BATCH: usize = 500;

/// Connection settings for [`RedisCacheBackend::connect`].
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// Redis URL.
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: usize,
    /// Timeout for opening a connection.
    pub connect_timeout: Duration,
    /// Timeout for checking a connection out of the pool.
    pub wait_timeout: Duration,
}

/// Redis-backed cache.
///
/// Commands are gated on the shared [`AvailabilityGuard`]. A connectivity
/// failure on any command flips the guard to `Error`; the supervisor owns
/// bringing it back and purging the invalidations deferred meanwhile.
pub struct RedisCacheBackend {
    pool: Pool,
    guard: Arc<AvailabilityGuard>,
}

impl RedisCacheBackend {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: Pool, guard: Arc<AvailabilityGuard>) -> Self {
        Self { pool, guard }
    }

    /// Builds the connection pool. No connection is opened until first use.
    pub fn connect(settings: &RedisSettings, guard: Arc<AvailabilityGuard>) -> CacheResult<Self> {
        let pool = Config::from_url(settings.url.as_str())
            .builder()
            .map_err(|e| CacheError::Configuration(format!("invalid Redis config: {}", e)))?
            .max_size(settings.pool_size)
            .create_timeout(Some(settings.connect_timeout))
            .wait_timeout(Some(settings.wait_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Configuration(format!("failed to build Redis pool: {}", e)))?;

        Ok(Self::new(pool, guard))
    }

    /// Returns the guard this backend reports to.
    #[must_use]
    pub fn guard(&self) -> &Arc<AvailabilityGuard> {
        &self.guard
    }

    async fn conn(&self) -> CacheResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// Logs a failed command and reports connectivity failures to the guard.
    fn record_failure(&self, operation: &str, key: &str, err: &CacheError) {
        warn!(operation, key, error = %err, "Cache command failed");
        if err.is_connectivity() {
            self.guard.on_error(err);
        }
    }

    async fn try_get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }
        Ok(value)
    }

    async fn try_set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let ttl_secs = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn try_delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn.del(key).await?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(())
    }

    /// Walks the keyspace with `SCAN` and deletes matches batch by batch.
    async fn try_delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: u64 = conn.del(&keys).await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Deleted {} keys matching pattern '{}'", deleted, pattern);
        Ok(deleted)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_available() {
            return None;
        }

        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.record_failure("get", key, &e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool {
        if !self.is_available() {
            return false;
        }

        match self.try_set(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.record_failure("set", key, &e);
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        if !self.is_available() {
            return false;
        }

        match self.try_delete(key).await {
            Ok(()) => true,
            Err(e) => {
                self.record_failure("delete", key, &e);
                false
            }
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> bool {
        if !self.is_available() {
            return false;
        }

        match self.try_delete_pattern(pattern).await {
            Ok(_) => true,
            Err(e) => {
                let failure = CacheError::PatternDeleteFailure {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                };
                warn!(error = %failure, "Invalidation did not complete");
                self.record_failure("delete_pattern", pattern, &e);
                false
            }
        }
    }

    /// The server may only be partitioned away with its keys intact, so the
    /// pattern is kept for the supervisor to purge on reconnect.
    fn defer_delete_pattern(&self, pattern: &str) -> bool {
        self.guard.defer_invalidation(pattern);
        true
    }

    fn is_available(&self) -> bool {
        self.guard.is_available()
    }
}

#[async_trait]
impl SupervisedBackend for RedisCacheBackend {
    /// Sends `PING` regardless of the guard's state.
    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn purge(&self, pattern: &str) -> CacheResult<()> {
        self.try_delete_pattern(pattern).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> RedisSettings {
        RedisSettings {
            url: url.to_string(),
            pool_size: 2,
            connect_timeout: Duration::from_millis(200),
            wait_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_pool_builds_without_connecting() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = RedisCacheBackend::connect(&settings("redis://127.0.0.1:1"), guard).unwrap();
        assert!(!backend.is_available());
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let guard = Arc::new(AvailabilityGuard::new());
        let result = RedisCacheBackend::connect(&settings("not-a-url"), guard);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_commands_skipped_while_not_ready() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend =
            RedisCacheBackend::connect(&settings("redis://127.0.0.1:1"), Arc::clone(&guard)).unwrap();

        assert_eq!(backend.get("k").await, None);
        assert!(!backend.set("k", b"v", Duration::from_secs(1)).await);
        assert!(!backend.delete_pattern("k*").await);
        assert_eq!(guard.state(), crate::ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_deferred_delete_recorded_on_guard() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend =
            RedisCacheBackend::connect(&settings("redis://127.0.0.1:1"), Arc::clone(&guard)).unwrap();

        assert!(backend.defer_delete_pattern("jobs:*"));
        assert_eq!(guard.deferred_invalidations(), vec!["jobs:*".to_string()]);

        guard.on_ready();
        assert!(!backend.is_available());
    }

    #[tokio::test]
    async fn test_ping_fails_against_closed_port() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = RedisCacheBackend::connect(&settings("redis://127.0.0.1:1"), guard).unwrap();
        let err = backend.ping().await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_purge_fails_against_closed_port() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = RedisCacheBackend::connect(&settings("redis://127.0.0.1:1"), guard).unwrap();
        assert!(backend.purge("jobs:*").await.is_err());
    }
}
