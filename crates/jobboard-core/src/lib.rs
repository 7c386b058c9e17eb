//! # Jobboard Core
//!
//! Core types, traits, and error definitions for Jobboard.
//! This crate provides the foundational abstractions shared by the cache
//! layer, the job service, and the server composition root.

pub mod error;
pub mod id;
pub mod pagination;
pub mod result;
pub mod telemetry;
pub mod traits;
pub mod validation;

pub use error::*;
pub use id::*;
pub use pagination::*;
pub use result::*;
pub use traits::*;
pub use validation::*;
