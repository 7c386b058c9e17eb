//! # Jobboard Config
//!
//! Configuration management for Jobboard.
//! Supports layered configuration from files and environment variables,
//! validated up front so a bad cache endpoint fails at startup rather than
//! silently at the first request.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
