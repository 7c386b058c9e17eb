//! Cache backend interface.

use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-entry TTL and pattern deletion.
///
/// Implementations swallow their own failures: a failed read is a miss and a
/// failed write or delete returns `false`. Callers check [`is_available`]
/// before issuing commands so an unavailable backend is never contacted.
///
/// [`is_available`]: CacheBackend::is_available
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the raw value stored under `key`.
    ///
    /// Returns `None` if the key is absent, expired, or the read failed.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool;

    /// Delete a single key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> bool;

    /// Delete every key matching a glob `pattern`.
    async fn delete_pattern(&self, pattern: &str) -> bool;

    /// Remember a pattern delete that could not be issued because the backend
    /// is unavailable. It must be applied before the backend reports available
    /// again.
    ///
    /// Returns `false` if the delete can be neither applied nor remembered.
    fn defer_delete_pattern(&self, pattern: &str) -> bool;

    /// Returns true if commands may be issued right now.
    fn is_available(&self) -> bool;
}

/// Backend used when no cache endpoint is configured.
///
/// Never available; every command is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCacheBackend;

#[async_trait]
impl CacheBackend for DisabledCacheBackend {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> bool {
        false
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn delete_pattern(&self, _pattern: &str) -> bool {
        false
    }

    /// Nothing is ever stored, so there is nothing to invalidate later.
    fn defer_delete_pattern(&self, _pattern: &str) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        false
    }
}
