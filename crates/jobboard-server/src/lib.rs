//! # Jobboard Server Library
//!
//! Builds the application graph from configuration so the binary and tests
//! share one wiring path.

pub mod app;
pub mod startup;

pub use app::{build_app, App};
