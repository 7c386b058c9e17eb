//! Application graph.

use jobboard_cache::{
    AvailabilityGuard, CacheBackend, CacheHealthCheck, ConnectionSupervisor, QueryCache,
    RedisCacheBackend, RedisSettings,
};
use jobboard_config::{AppConfig, CacheConfig};
use jobboard_core::JobBoardResult;
use jobboard_service::{CacheTtl, InMemoryJobRepository, JobService, JobServiceImpl};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Wired application components.
pub struct App {
    job_service: Arc<dyn JobService>,
    cache: QueryCache,
    guard: Arc<AvailabilityGuard>,
    supervisor: Option<Arc<ConnectionSupervisor>>,
}

impl App {
    /// Returns the job service.
    #[must_use]
    pub fn job_service(&self) -> Arc<dyn JobService> {
        Arc::clone(&self.job_service)
    }

    /// Returns the query cache shared by all services.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Returns a health check over the cache connection.
    #[must_use]
    pub fn cache_health(&self) -> CacheHealthCheck {
        CacheHealthCheck::new(Arc::clone(&self.guard))
    }

    /// Returns true if a cache backend is configured.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        !self.guard.is_disabled()
    }

    /// Starts the connection supervisor, if caching is enabled.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        self.supervisor.as_ref().map(|supervisor| Arc::clone(supervisor).spawn())
    }

    /// Stops background tasks.
    pub fn shutdown(&self) {
        if let Some(supervisor) = &self.supervisor {
            supervisor.stop();
        }
    }
}

/// Builds the application graph from configuration.
///
/// Opens no connections: the Redis pool is lazy and the supervisor only runs
/// once [`App::start`] is called.
pub fn build_app(config: &AppConfig) -> JobBoardResult<App> {
    let (cache, guard, supervisor) = build_cache(&config.cache)?;

    let ttl = CacheTtl {
        list: config.cache.list_ttl(),
        detail: config.cache.detail_ttl(),
    };
    let job_service = JobServiceImpl::new(Arc::new(InMemoryJobRepository::new()), cache.clone())
        .with_ttl(ttl);

    Ok(App {
        job_service: Arc::new(job_service),
        cache,
        guard,
        supervisor,
    })
}

fn build_cache(
    config: &CacheConfig,
) -> JobBoardResult<(QueryCache, Arc<AvailabilityGuard>, Option<Arc<ConnectionSupervisor>>)> {
    let Some(url) = config.endpoint() else {
        info!("No cache endpoint configured; reads go straight to the repository");
        return Ok((
            QueryCache::disabled(),
            Arc::new(AvailabilityGuard::disabled()),
            None,
        ));
    };

    let settings = RedisSettings {
        url: url.to_string(),
        pool_size: config.pool_size,
        connect_timeout: config.connect_timeout(),
        wait_timeout: config.wait_timeout(),
    };
    debug!(pool_size = settings.pool_size, "Building Redis pool");

    let guard = Arc::new(AvailabilityGuard::new());
    let backend = Arc::new(RedisCacheBackend::connect(&settings, Arc::clone(&guard))?);

    let supervisor = ConnectionSupervisor::new(
        backend.clone(),
        Arc::clone(&guard),
        config.reconnect.policy(),
        config.health_check_interval(),
    );

    let backend: Arc<dyn CacheBackend> = backend;
    Ok((QueryCache::new(backend), guard, Some(Arc::new(supervisor))))
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("cache_state", &self.guard.state())
            .field("cache_enabled", &self.cache_enabled())
            .finish_non_exhaustive()
    }
}
