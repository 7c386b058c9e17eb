//! Backend availability tracking.
//!
//! The guard is the single source of truth for "may the cache be used right
//! now". Reads and writes consult it before touching the backend, so an outage
//! costs a couple of atomic loads per request instead of a network timeout.
//!
//! It also holds the invalidations that could not be issued while the backend
//! was unreachable. Until they are applied the backend stays unavailable, even
//! in `Ready`, so entries written before the outage cannot be served.

use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use jobboard_core::{HealthCheck, HealthStatus};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Backend connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting = 0,
    /// The backend is reachable and accepting commands.
    Ready = 1,
    /// The backend failed and has not recovered.
    Error = 2,
}

impl ConnectionState {
    /// Returns the lowercase name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Ready,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event reported by a backend connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt started.
    Connect,
    /// The connection is ready for commands.
    Ready,
    /// The connection failed.
    Error(String),
}

/// Tracks whether the cache backend may be used.
///
/// Available only while the state is [`ConnectionState::Ready`], no deferred
/// invalidation is outstanding and caching has not been disabled. A disabled
/// guard ignores every event.
pub struct AvailabilityGuard {
    state: AtomicU8,
    disabled: bool,
    last_error: Mutex<Option<String>>,
    failure: Notify,
    deferred: Mutex<BTreeSet<String>>,
    has_deferred: AtomicBool,
}

impl AvailabilityGuard {
    /// Creates a guard for a configured backend, starting in `Connecting`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            disabled: false,
            last_error: Mutex::new(None),
            failure: Notify::new(),
            deferred: Mutex::new(BTreeSet::new()),
            has_deferred: AtomicBool::new(false),
        }
    }

    /// Creates a guard that never reports the backend as available.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Error as u8),
            disabled: true,
            last_error: Mutex::new(Some("caching disabled".to_string())),
            failure: Notify::new(),
            deferred: Mutex::new(BTreeSet::new()),
            has_deferred: AtomicBool::new(false),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Acquire))
    }

    /// Returns true if the cache may be used.
    pub fn is_available(&self) -> bool {
        !self.disabled
            && self.state() == ConnectionState::Ready
            && !self.has_deferred_invalidations()
    }

    /// Returns true if caching was disabled at construction.
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the most recent failure reason, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// A connection attempt started.
    pub fn on_connect(&self) {
        self.transition(ConnectionState::Connecting);
    }

    /// The connection became ready.
    pub fn on_ready(&self) {
        if self.transition(ConnectionState::Ready) {
            *self.last_error.lock() = None;
        }
    }

    /// The connection failed.
    pub fn on_error(&self, reason: impl fmt::Display) {
        if self.disabled {
            return;
        }

        let reason = reason.to_string();
        if self.transition(ConnectionState::Error) {
            warn!(reason = %reason, "Cache backend unavailable");
        } else {
            debug!(reason = %reason, "Cache backend error while already unavailable");
        }
        *self.last_error.lock() = Some(reason);
        self.failure.notify_one();
    }

    /// Applies a lifecycle event.
    pub fn handle(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connect => self.on_connect(),
            ConnectionEvent::Ready => self.on_ready(),
            ConnectionEvent::Error(reason) => self.on_error(reason),
        }
    }

    /// Records a pattern delete that could not be issued.
    ///
    /// The guard reports unavailable until the pattern is passed to
    /// [`complete_invalidation`](Self::complete_invalidation). Ignored when
    /// caching is disabled, since nothing is ever stored.
    pub fn defer_invalidation(&self, pattern: &str) {
        if self.disabled {
            return;
        }

        let mut deferred = self.deferred.lock();
        if deferred.insert(pattern.to_string()) {
            debug!(pattern, "Invalidation deferred until the backend recovers");
        }
        self.has_deferred.store(true, Ordering::Release);
    }

    /// Returns true if any deferred invalidation is outstanding.
    pub fn has_deferred_invalidations(&self) -> bool {
        self.has_deferred.load(Ordering::Acquire)
    }

    /// Returns the outstanding deferred patterns in order.
    pub fn deferred_invalidations(&self) -> Vec<String> {
        self.deferred.lock().iter().cloned().collect()
    }

    /// Marks a deferred pattern as applied.
    pub fn complete_invalidation(&self, pattern: &str) {
        let mut deferred = self.deferred.lock();
        deferred.remove(pattern);
        self.has_deferred.store(!deferred.is_empty(), Ordering::Release);
    }

    /// Completes after the next reported failure.
    ///
    /// A failure reported while nobody is waiting is remembered, so the next
    /// call returns immediately.
    pub async fn failure_reported(&self) {
        self.failure.notified().await;
    }

    /// Stores `next` and returns true if the state actually changed.
    fn transition(&self, next: ConnectionState) -> bool {
        if self.disabled {
            return false;
        }

        let previous = ConnectionState::from(self.state.swap(next as u8, Ordering::AcqRel));
        if previous == next {
            return false;
        }

        CacheMetrics::state_changed(next);
        match next {
            ConnectionState::Ready => info!(from = %previous, "Cache backend ready"),
            ConnectionState::Connecting => debug!(from = %previous, "Cache backend connecting"),
            ConnectionState::Error => debug!(from = %previous, "Cache backend entered error state"),
        }
        true
    }
}

impl Default for AvailabilityGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AvailabilityGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityGuard")
            .field("state", &self.state())
            .field("disabled", &self.disabled)
            .field("deferred", &self.has_deferred_invalidations())
            .finish_non_exhaustive()
    }
}

/// Health check reporting the cache connection state.
///
/// The cache is optional, so an outage is reported as degraded, never
/// unhealthy.
pub struct CacheHealthCheck {
    guard: Arc<AvailabilityGuard>,
}

impl CacheHealthCheck {
    /// Creates a health check over the given guard.
    #[must_use]
    pub fn new(guard: Arc<AvailabilityGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl HealthCheck for CacheHealthCheck {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> HealthStatus {
        if self.guard.is_disabled() {
            return HealthStatus::Degraded("caching disabled".to_string());
        }

        match self.guard.state() {
            ConnectionState::Ready if self.guard.has_deferred_invalidations() => {
                HealthStatus::Degraded("applying deferred invalidations".to_string())
            }
            ConnectionState::Ready => HealthStatus::Healthy,
            ConnectionState::Connecting => HealthStatus::Degraded("connecting".to_string()),
            ConnectionState::Error => HealthStatus::Degraded(
                self.guard
                    .last_error()
                    .unwrap_or_else(|| "backend error".to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_connecting_and_unavailable() {
        let guard = AvailabilityGuard::new();
        assert_eq!(guard.state(), ConnectionState::Connecting);
        assert!(!guard.is_available());
    }

    #[test]
    fn test_ready_makes_available() {
        let guard = AvailabilityGuard::new();
        guard.on_ready();
        assert!(guard.is_available());
    }

    #[test]
    fn test_error_then_recovery() {
        let guard = AvailabilityGuard::new();
        guard.on_ready();
        guard.on_error("connection reset");
        assert_eq!(guard.state(), ConnectionState::Error);
        assert!(!guard.is_available());
        assert_eq!(guard.last_error().as_deref(), Some("connection reset"));

        guard.on_connect();
        assert!(!guard.is_available());
        guard.on_ready();
        assert!(guard.is_available());
        assert_eq!(guard.last_error(), None);
    }

    #[test]
    fn test_handle_dispatches_events() {
        let guard = AvailabilityGuard::new();
        guard.handle(ConnectionEvent::Ready);
        assert_eq!(guard.state(), ConnectionState::Ready);
        guard.handle(ConnectionEvent::Error("boom".into()));
        assert_eq!(guard.state(), ConnectionState::Error);
        guard.handle(ConnectionEvent::Connect);
        assert_eq!(guard.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_disabled_ignores_events() {
        let guard = AvailabilityGuard::disabled();
        guard.on_connect();
        guard.on_ready();
        assert!(guard.is_disabled());
        assert!(!guard.is_available());
        assert_eq!(guard.state(), ConnectionState::Error);
    }

    #[test]
    fn test_deferred_invalidation_blocks_availability() {
        let guard = AvailabilityGuard::new();
        guard.on_ready();
        guard.on_error("partitioned");
        guard.defer_invalidation("jobs:*");
        guard.defer_invalidation("jobs:*");
        guard.defer_invalidation("companies:*");

        guard.on_ready();
        assert_eq!(guard.state(), ConnectionState::Ready);
        assert!(!guard.is_available());
        assert_eq!(
            guard.deferred_invalidations(),
            vec!["companies:*".to_string(), "jobs:*".to_string()]
        );

        guard.complete_invalidation("jobs:*");
        assert!(!guard.is_available());
        guard.complete_invalidation("companies:*");
        assert!(!guard.has_deferred_invalidations());
        assert!(guard.is_available());
    }

    #[test]
    fn test_disabled_ignores_deferred_invalidations() {
        let guard = AvailabilityGuard::disabled();
        guard.defer_invalidation("jobs:*");
        assert!(!guard.has_deferred_invalidations());
        assert!(guard.deferred_invalidations().is_empty());
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(ConnectionState::from(0), ConnectionState::Connecting);
        assert_eq!(ConnectionState::from(1), ConnectionState::Ready);
        assert_eq!(ConnectionState::from(2), ConnectionState::Error);
        assert_eq!(ConnectionState::from(9), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_failure_is_remembered_without_waiter() {
        let guard = AvailabilityGuard::new();
        guard.on_error("gone");
        tokio::time::timeout(Duration::from_millis(100), guard.failure_reported())
            .await
            .expect("pending failure should wake immediately");
    }

    #[tokio::test]
    async fn test_health_check_reports_state() {
        let guard = Arc::new(AvailabilityGuard::new());
        let check = CacheHealthCheck::new(Arc::clone(&guard));
        assert_eq!(check.name(), "cache");
        assert_eq!(
            check.check().await,
            HealthStatus::Degraded("connecting".into())
        );

        guard.on_ready();
        assert!(check.check().await.is_healthy());

        guard.on_error("refused");
        assert_eq!(check.check().await, HealthStatus::Degraded("refused".into()));

        guard.defer_invalidation("jobs:*");
        guard.on_ready();
        assert_eq!(
            check.check().await,
            HealthStatus::Degraded("applying deferred invalidations".into())
        );
    }

    #[tokio::test]
    async fn test_health_check_disabled() {
        let check = CacheHealthCheck::new(Arc::new(AvailabilityGuard::disabled()));
        assert!(!check.check().await.is_unhealthy());
        assert!(!check.check().await.is_healthy());
    }
}
