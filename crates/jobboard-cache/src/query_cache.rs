//! Entry point used by resource services.

use crate::backend::{CacheBackend, DisabledCacheBackend};
use crate::invalidation::InvalidationManager;
use crate::keys::{detail_key, list_key, ListQuery, Namespace};
use crate::reader::CacheAsideReader;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cache-aside reads and post-write invalidation for list and detail queries.
///
/// Services call `fetch_list` / `fetch_detail` in place of a direct datastore
/// read and `on_mutated` right after every create, update or delete.
#[derive(Clone)]
pub struct QueryCache {
    backend: Arc<dyn CacheBackend>,
    reader: CacheAsideReader,
    invalidation: InvalidationManager,
}

impl QueryCache {
    /// Creates a facade over the given backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            reader: CacheAsideReader::new(Arc::clone(&backend)),
            invalidation: InvalidationManager::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// Creates a facade that always reads from the source of truth.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCacheBackend))
    }

    /// Returns true if the backend is currently usable.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Reads one page of a list through the cache.
    pub async fn fetch_list<T, E, F, Fut>(
        &self,
        namespace: &Namespace,
        query: &ListQuery,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = list_key(namespace, query);
        self.reader.get_or_compute(&key, compute, ttl).await
    }

    /// Reads a single entity through the cache.
    pub async fn fetch_detail<T, E, F, Fut>(
        &self,
        namespace: &Namespace,
        id: impl fmt::Display,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = detail_key(namespace, id);
        self.reader.get_or_compute(&key, compute, ttl).await
    }

    /// Invalidates `namespace` after a committed write.
    ///
    /// See [`InvalidationManager::invalidate_namespace`] for the meaning of the
    /// return value.
    pub async fn on_mutated(&self, namespace: &Namespace) -> bool {
        self.invalidation.invalidate_namespace(namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::InMemoryCacheBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const JOBS: Namespace = Namespace::from_static("jobs");
    const COMPANIES: Namespace = Namespace::from_static("companies");
    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_fetch_list_caches_under_list_key() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = QueryCache::new(backend.clone());
        let query = ListQuery::from_parts(1, 10, " Rust ").unwrap();

        let titles: Vec<String> = cache
            .fetch_list(&JOBS, &query, TTL, || async {
                Ok::<_, String>(vec!["Rust Engineer".to_string()])
            })
            .await
            .unwrap();

        assert_eq!(titles.len(), 1);
        assert!(backend.contains_key("jobs:list:page:1:limit:10:search:rust"));
    }

    #[tokio::test]
    async fn test_fetch_detail_caches_under_detail_key() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = QueryCache::new(backend.clone());

        let title: String = cache
            .fetch_detail(&JOBS, 17, TTL, || async { Ok::<_, String>("Rust Engineer".into()) })
            .await
            .unwrap();

        assert_eq!(title, "Rust Engineer");
        assert!(backend.contains_key("jobs:item:17"));
    }

    #[tokio::test]
    async fn test_on_mutated_forces_recompute() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = QueryCache::new(backend.clone());
        let query = ListQuery::default();
        let calls = AtomicUsize::new(0);
        let compute = || async {
            Ok::<_, String>(calls.fetch_add(1, Ordering::SeqCst))
        };

        assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 0);
        assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 0);

        assert!(cache.on_mutated(&JOBS).await);
        assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_on_mutated_leaves_other_namespaces() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = QueryCache::new(backend.clone());

        cache
            .fetch_detail(&COMPANIES, 1, TTL, || async { Ok::<_, String>(1u32) })
            .await
            .unwrap();
        cache.on_mutated(&JOBS).await;

        assert!(backend.contains_key("companies:item:1"));
    }

    #[tokio::test]
    async fn test_disabled_always_computes() {
        let cache = QueryCache::disabled();
        let calls = AtomicUsize::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(())
        };

        cache.fetch_detail(&JOBS, 1, TTL, compute).await.unwrap();
        cache.fetch_detail(&JOBS, 1, TTL, compute).await.unwrap();

        assert!(!cache.is_available());
        assert!(cache.on_mutated(&JOBS).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
