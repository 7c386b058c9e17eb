//! In-process cache backend.
//!
//! Used in tests and single-node deployments. Expiry runs on tokio's clock so
//! paused-time tests can advance past a TTL without sleeping.

use crate::availability::{AvailabilityGuard, ConnectionState};
use crate::backend::CacheBackend;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Expired entries are swept once every this many writes.
const PURGE_EVERY_WRITES: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Map-backed cache with per-entry expiry.
///
/// Availability follows the attached [`AvailabilityGuard`]; while it reports
/// unavailable, stored entries are unreachable but kept. Invalidations deferred
/// during that time are applied as soon as the guard is ready again.
///
/// Expired entries are dropped when read, and swept from the whole map every
/// few hundred writes so keys that are never read again do not accumulate.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, Entry>>,
    guard: Arc<AvailabilityGuard>,
    writes: AtomicUsize,
}

impl InMemoryCacheBackend {
    /// Creates an always-ready backend.
    #[must_use]
    pub fn new() -> Self {
        let guard = AvailabilityGuard::new();
        guard.on_ready();
        Self::with_guard(Arc::new(guard))
    }

    /// Creates a backend whose availability follows `guard`.
    #[must_use]
    pub fn with_guard(guard: Arc<AvailabilityGuard>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            guard,
            writes: AtomicUsize::new(0),
        }
    }

    /// Returns the guard controlling this backend.
    #[must_use]
    pub fn guard(&self) -> &Arc<AvailabilityGuard> {
        &self.guard
    }

    /// Returns true if a live entry exists under `key`, ignoring availability.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Returns the number of live entries, ignoring availability.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Returns true if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        debug!(purged = before - entries.len(), "Purged expired entries");
    }

    /// Removes `key` if it is still expired at `now`.
    ///
    /// Re-checked under the write lock: a set may have replaced the entry
    /// since it was seen expired.
    fn evict_expired(&self, key: &str, now: Instant) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            debug!(key, "Expired entry evicted");
        }
    }

    /// Deletes the patterns the guard deferred while the backend was down.
    fn apply_deferred(&self) {
        let mut entries = self.entries.write();
        for pattern in self.guard.deferred_invalidations() {
            entries.retain(|key, _| !glob_matches(&pattern, key));
            self.guard.complete_invalidation(&pattern);
            debug!(pattern = %pattern, "Applied deferred invalidation");
        }
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_available() {
            return None;
        }

        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.evict_expired(key, now);
        None
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool {
        if !self.is_available() || ttl.is_zero() {
            return false;
        }

        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY_WRITES == 0 {
            self.purge_expired();
        }
        true
    }

    async fn delete(&self, key: &str) -> bool {
        if !self.is_available() {
            return false;
        }

        self.entries.write().remove(key);
        true
    }

    async fn delete_pattern(&self, pattern: &str) -> bool {
        if !self.is_available() {
            return false;
        }

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !glob_matches(pattern, key));
        debug!(pattern, deleted = before - entries.len(), "Deleted keys matching pattern");
        true
    }

    fn defer_delete_pattern(&self, pattern: &str) -> bool {
        self.guard.defer_invalidation(pattern);
        true
    }

    fn is_available(&self) -> bool {
        if self.guard.has_deferred_invalidations() && self.guard.state() == ConnectionState::Ready
        {
            self.apply_deferred();
        }
        self.guard.is_available()
    }
}

/// Glob match supporting `*` (any run) and `?` (any single character).
fn glob_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, k));
                p += 1;
            }
            Some(&c) if c == '?' || c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match star {
                Some((star_p, star_k)) => {
                    p = star_p + 1;
                    k = star_k + 1;
                    star = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
