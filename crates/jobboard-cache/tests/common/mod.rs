//! Common test infrastructure for Redis integration tests.

use jobboard_cache::{AvailabilityGuard, RedisCacheBackend, RedisSettings, SupervisedBackend};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

/// Redis testcontainer with a ready backend attached.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    backend: Arc<RedisCacheBackend>,
    guard: Arc<AvailabilityGuard>,
}

impl TestRedis {
    /// Starts a fresh Redis container and waits until it answers `PING`.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(REDIS_PORT)
            .await
            .expect("Failed to get Redis port");

        let settings = RedisSettings {
            url: format!("redis://127.0.0.1:{}", port),
            pool_size: 4,
            connect_timeout: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(2),
        };

        let guard = Arc::new(AvailabilityGuard::new());
        let backend = Arc::new(
            RedisCacheBackend::connect(&settings, Arc::clone(&guard))
                .expect("Failed to build Redis pool"),
        );

        Self::wait_until_ready(&backend, 30).await;
        guard.on_ready();

        Self {
            _container: container,
            backend,
            guard,
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> Arc<RedisCacheBackend> {
        Arc::clone(&self.backend)
    }

    /// Returns the guard shared with the backend.
    pub fn guard(&self) -> Arc<AvailabilityGuard> {
        Arc::clone(&self.guard)
    }

    async fn wait_until_ready(backend: &RedisCacheBackend, max_attempts: u32) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match backend.ping().await {
                Ok(()) => return,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Redis not ready after {} attempts: {}", max_attempts, e);
                    }
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }
    }
}
