//! Out-of-band connection management.
//!
//! The supervisor is the only component that tries to (re)establish the
//! backend connection. Request paths never wait on it: they read the guard,
//! and while it is not ready they go straight to the source of truth.

use crate::availability::{AvailabilityGuard, ConnectionState};
use crate::error::CacheResult;
use async_trait::async_trait;
use jobboard_resilience::RetryPolicy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// Backend operations the supervisor issues regardless of the guard's state.
#[async_trait]
pub trait SupervisedBackend: Send + Sync {
    /// Cheap liveness check. Returns `Ok` if the backend answered.
    async fn ping(&self) -> CacheResult<()>;

    /// Deletes every key matching `pattern`.
    async fn purge(&self, pattern: &str) -> CacheResult<()>;
}

enum Flow {
    Continue,
    Stop,
}

/// Drives the [`AvailabilityGuard`] from ping results.
///
/// Connects with backoff, then pings every `health_check_interval` and reacts
/// to failures reported by request paths. With a bounded retry policy it gives
/// up after the last attempt and leaves the guard in `Error`.
///
/// Invalidations deferred during an outage are purged after a successful ping
/// and before the guard is marked ready, so entries stored before the outage
/// are never served afterwards.
pub struct ConnectionSupervisor {
    backend: Arc<dyn SupervisedBackend>,
    guard: Arc<AvailabilityGuard>,
    policy: RetryPolicy,
    health_check_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
}

impl ConnectionSupervisor {
    /// Creates a supervisor.
    pub fn new(
        backend: Arc<dyn SupervisedBackend>,
        guard: Arc<AvailabilityGuard>,
        policy: RetryPolicy,
        health_check_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            backend,
            guard,
            policy,
            health_check_interval,
            shutdown_tx,
            stopped: AtomicBool::new(false),
        }
    }

    /// Runs the supervisor on a background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(
            async move { self.run().await }.instrument(tracing::info_span!("cache_supervisor")),
        )
    }

    /// Runs until [`stop`](Self::stop) is called or retries are exhausted.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        if self.guard.is_disabled() {
            debug!("Caching disabled; supervisor has nothing to do");
            return;
        }

        info!(
            interval_ms = self.health_check_interval.as_millis() as u64,
            "Starting cache connection supervisor"
        );

        while !self.stopped.load(Ordering::SeqCst) {
            if let Flow::Stop = self.connect(&mut shutdown_rx).await {
                break;
            }
            if let Flow::Stop = self.monitor(&mut shutdown_rx).await {
                break;
            }
        }

        info!("Cache connection supervisor stopped");
    }

    /// Signals the supervisor to stop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Pings until the backend answers and deferred invalidations are purged,
    /// backing off between attempts.
    async fn connect(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> Flow {
        let mut attempts: u32 = 0;

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return Flow::Stop;
            }

            self.guard.on_connect();
            let result = tokio::select! {
                result = self.check() => result,
                _ = shutdown_rx.recv() => return Flow::Stop,
            };
            attempts = attempts.saturating_add(1);

            let err = match result {
                Ok(()) => {
                    self.guard.on_ready();
                    if attempts > 1 {
                        info!(attempts, "Cache backend reconnected");
                    }
                    return Flow::Continue;
                }
                Err(err) => err,
            };

            self.guard.on_error(&err);

            if !self.policy.should_retry(attempts) {
                error!(
                    attempts,
                    error = %err,
                    "Giving up on cache backend; reads will use the source of truth"
                );
                return Flow::Stop;
            }

            let delay = self.policy.delay_for_attempt(attempts);
            debug!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                "Cache connection attempt failed; retrying"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => return Flow::Stop,
            }
        }
    }

    /// Watches a ready connection; returns `Continue` once it is lost.
    async fn monitor(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> Flow {
        let mut ticker = tokio::time::interval(self.health_check_interval);
        ticker.tick().await;

        // Invalidations deferred between the purge and `on_ready` keep the
        // guard unavailable until they are applied here.
        if let Err(err) = self.purge_deferred().await {
            self.guard.on_error(&err);
            return Flow::Continue;
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return Flow::Stop,
                _ = ticker.tick() => {
                    if let Err(err) = self.check().await {
                        self.guard.on_error(&err);
                        return Flow::Continue;
                    }
                }
                () = self.guard.failure_reported() => {
                    if self.guard.state() != ConnectionState::Ready {
                        return Flow::Continue;
                    }
                }
            }
        }
    }

    async fn check(&self) -> CacheResult<()> {
        self.backend.ping().await?;
        self.purge_deferred().await
    }

    /// Applies every deferred invalidation, stopping at the first failure.
    async fn purge_deferred(&self) -> CacheResult<()> {
        for pattern in self.guard.deferred_invalidations() {
            if let Err(err) = self.backend.purge(&pattern).await {
                warn!(pattern = %pattern, error = %err, "Deferred invalidation failed");
                return Err(err);
            }
            self.guard.complete_invalidation(&pattern);
            info!(pattern = %pattern, "Applied deferred invalidation");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Returns scripted ping results in order, then succeeds.
    #[derive(Default)]
    struct ScriptedBackend {
        script: Mutex<VecDeque<bool>>,
        calls: AtomicUsize,
        always_fail: bool,
        purge_fails: AtomicBool,
        purged: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(script: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                ..Default::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                always_fail: true,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn purged(&self) -> Vec<String> {
            self.purged.lock().clone()
        }
    }

    #[async_trait]
    impl SupervisedBackend for ScriptedBackend {
        async fn ping(&self) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = !self.always_fail && self.script.lock().pop_front().unwrap_or(true);
            if ok {
                Ok(())
            } else {
                Err(CacheError::BackendUnavailable)
            }
        }

        async fn purge(&self, pattern: &str) -> CacheResult<()> {
            if self.purge_fails.load(Ordering::SeqCst) {
                return Err(CacheError::BackendUnavailable);
            }
            self.purged.lock().push(pattern.to_string());
            Ok(())
        }
    }

    fn supervisor(
        backend: Arc<ScriptedBackend>,
        guard: &Arc<AvailabilityGuard>,
        policy: RetryPolicy,
        interval: Duration,
    ) -> Arc<ConnectionSupervisor> {
        Arc::new(ConnectionSupervisor::new(
            backend,
            Arc::clone(guard),
            policy,
            interval,
        ))
    }

    fn linear() -> RetryPolicy {
        RetryPolicy::linear(Duration::from_millis(50), Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_becomes_ready() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(guard.is_available());
        assert_eq!(backend.calls(), 1);

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff_until_ready() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[false, false, true]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!guard.is_available());
        assert_eq!(backend.calls(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(guard.is_available());
        assert_eq!(backend.calls(), 3);

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_when_bounded() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::failing();
        let sup = supervisor(
            Arc::clone(&backend),
            &guard,
            linear().with_max_attempts(3),
            Duration::from_secs(60),
        );

        tokio::time::timeout(Duration::from_secs(10), Arc::clone(&sup).spawn())
            .await
            .expect("supervisor should give up")
            .unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(guard.state(), ConnectionState::Error);
        assert!(!guard.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reported_failure_triggers_reconnect() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(guard.is_available());

        guard.on_error("connection reset by peer");
        assert!(!guard.is_available());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(guard.is_available());
        assert_eq!(backend.calls(), 2);

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_detects_outage() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[true, false, true]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(1));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(backend.calls(), 3);
        assert!(guard.is_available());

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_invalidations_purged_before_ready() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(guard.is_available());

        guard.on_error("connection reset by peer");
        guard.defer_invalidation("jobs:*");
        assert!(!guard.is_available());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.purged(), vec!["jobs:*".to_string()]);
        assert!(!guard.has_deferred_invalidations());
        assert!(guard.is_available());

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_purge_keeps_cache_unavailable() {
        let guard = Arc::new(AvailabilityGuard::new());
        guard.defer_invalidation("jobs:*");
        let backend = ScriptedBackend::new(&[]);
        backend.purge_fails.store(true, Ordering::SeqCst);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));
        let handle = Arc::clone(&sup).spawn();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!guard.is_available());
        assert_eq!(guard.state(), ConnectionState::Error);
        assert!(guard.has_deferred_invalidations());

        backend.purge_fails.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(guard.is_available());
        assert_eq!(backend.purged(), vec!["jobs:*".to_string()]);

        sup.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let guard = Arc::new(AvailabilityGuard::new());
        let backend = ScriptedBackend::new(&[]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));

        sup.stop();
        tokio::time::timeout(Duration::from_secs(1), sup.run())
            .await
            .expect("stopped supervisor should return");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_guard_skips_probing() {
        let guard = Arc::new(AvailabilityGuard::disabled());
        let backend = ScriptedBackend::new(&[]);
        let sup = supervisor(Arc::clone(&backend), &guard, linear(), Duration::from_secs(60));

        sup.run().await;
        assert_eq!(backend.calls(), 0);
        assert!(!guard.is_available());
    }
}
