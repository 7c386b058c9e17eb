//! # Jobboard Cache
//!
//! Cache-aside layer for paginated list and single-entity reads.
//!
//! Reads go through [`QueryCache::fetch_list`] and [`QueryCache::fetch_detail`];
//! writes call [`QueryCache::on_mutated`] to drop every entry of the affected
//! namespace. The cache is strictly optional: when the backend is missing or
//! down, reads are served from the source of truth and invalidations are
//! deferred until the backend is reachable again.
//!
//! ## Components
//!
//! - [`keys`]: key and pattern construction
//! - [`CacheBackend`]: Redis, in-memory and disabled backends
//! - [`AvailabilityGuard`]: connection state gate
//! - [`ConnectionSupervisor`]: out-of-band connect, reconnect and health checks
//! - [`CacheAsideReader`] and [`InvalidationManager`]

pub mod availability;
pub mod backend;
pub mod error;
pub mod invalidation;
pub mod keys;
pub mod memory_backend;
pub mod metrics;
pub mod query_cache;
pub mod reader;
pub mod redis_backend;
pub mod supervisor;

pub use availability::{AvailabilityGuard, CacheHealthCheck, ConnectionEvent, ConnectionState};
pub use backend::{CacheBackend, DisabledCacheBackend};
pub use error::{CacheError, CacheResult};
pub use invalidation::InvalidationManager;
pub use keys::{normalize_search, ListQuery, Namespace};
pub use memory_backend::InMemoryCacheBackend;
pub use metrics::{register_metrics, CacheMetrics};
pub use query_cache::QueryCache;
pub use reader::CacheAsideReader;
pub use redis_backend::{RedisCacheBackend, RedisSettings};
pub use supervisor::{ConnectionSupervisor, SupervisedBackend};
