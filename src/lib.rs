//! redis-info-collector library
//!
//! Periodically fetches INFO status text from Redis-compatible instances,
//! derives a few fields, and dispatches a selected set of numeric metrics.

pub mod client;
pub mod config;
pub mod info;
pub mod metrics;
pub mod scheduler;
pub mod utils;
