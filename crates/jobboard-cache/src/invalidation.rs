//! Namespace-wide invalidation.

use crate::backend::CacheBackend;
use crate::keys::{namespace_pattern, Namespace};
use crate::metrics::CacheMetrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drops every cached entry of a namespace after a write.
#[derive(Clone)]
pub struct InvalidationManager {
    backend: Arc<dyn CacheBackend>,
}

impl InvalidationManager {
    /// Creates a manager over the given backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Deletes all keys under `namespace`.
    ///
    /// While the backend is unavailable the delete is deferred to the backend
    /// and `true` is returned: no entry of the namespace stored before the
    /// call is served again. Returns `false` only if the delete was issued
    /// and failed, in which case stale entries may survive until their TTL.
    pub async fn invalidate_namespace(&self, namespace: &Namespace) -> bool {
        let pattern = namespace_pattern(namespace);

        if !self.backend.is_available() {
            if self.backend.defer_delete_pattern(&pattern) {
                debug!(%namespace, "Cache unavailable; invalidation deferred");
                CacheMetrics::invalidated(namespace.as_str(), "deferred");
                return true;
            }
            warn!(%namespace, "Cache unavailable and invalidation could not be deferred");
            CacheMetrics::invalidated(namespace.as_str(), "failed");
            return false;
        }

        if self.backend.delete_pattern(&pattern).await {
            info!(%namespace, "Invalidated cache namespace");
            CacheMetrics::invalidated(namespace.as_str(), "deleted");
            true
        } else {
            warn!(%namespace, pattern = %pattern, "Cache invalidation failed; entries expire by TTL");
            CacheMetrics::invalidated(namespace.as_str(), "failed");
            false
        }
    }
}
