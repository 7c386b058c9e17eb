//! # Jobboard Resilience
//!
//! Resilience patterns for Jobboard.
//! Provides the capped backoff policy used to reconnect the cache backend.

pub mod retry;

pub use retry::*;
