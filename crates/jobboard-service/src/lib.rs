//! # Jobboard Service
//!
//! Job posting use cases. Reads are served through the query cache and every
//! write invalidates the `jobs` namespace once the repository has committed.

pub mod dto;
pub mod job;
pub mod job_service;
pub mod repository;
pub mod r#impl;

pub use dto::*;
pub use job::*;
pub use job_service::*;
pub use r#impl::*;
pub use repository::{InMemoryJobRepository, JobRepository};
