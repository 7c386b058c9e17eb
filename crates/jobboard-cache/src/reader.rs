//! Cache-aside reads.

use crate::backend::CacheBackend;
use crate::metrics::{namespace_of, CacheMetrics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Serves reads from the cache, falling back to a compute function.
///
/// Cache problems never surface to the caller: an unavailable backend, a
/// failed read and an undecodable entry all behave like a miss, and a failed
/// write is logged and dropped. Only the compute function's own error is
/// returned.
#[derive(Clone)]
pub struct CacheAsideReader {
    backend: Arc<dyn CacheBackend>,
}

impl CacheAsideReader {
    /// Creates a reader over the given backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// Concurrent misses on the same key each run `compute`; the last write
    /// wins.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let namespace = namespace_of(key);

        if self.backend.is_available() {
            if let Some(value) = self.lookup::<T>(key, namespace).await {
                return Ok(value);
            }
        } else {
            debug!(key, "Cache unavailable; reading from source");
            CacheMetrics::bypass(namespace);
        }

        let value = compute().await?;
        CacheMetrics::computed(namespace);
        self.store(key, namespace, &value, ttl).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str, namespace: &str) -> Option<T> {
        let Some(bytes) = self.backend.get(key).await else {
            CacheMetrics::miss(namespace);
            return None;
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                CacheMetrics::hit(namespace);
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                CacheMetrics::decode_failed(namespace);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, namespace: &str, value: &T, ttl: Duration) {
        if !self.backend.is_available() {
            return;
        }

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode value for caching");
                CacheMetrics::set_failed(namespace);
                return;
            }
        };

        if !self.backend.set(key, &bytes, ttl).await {
            debug!(key, "Cache write skipped");
            CacheMetrics::set_failed(namespace);
        }
    }
}
