//! Job service implementations.
//!
//! Trait definitions live in the parent module (`job_service.rs`).

pub mod job_service_impl;

pub use job_service_impl::{CacheTtl, JobServiceImpl, JOBS_NAMESPACE};
