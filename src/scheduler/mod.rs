//! Collection scheduling
//!
//! - Per-endpoint cycle state machine
//! - Concurrent cycles over all endpoints at a fixed interval

pub mod cycle;
pub mod runner;

pub use cycle::{CycleStage, EndpointCycle, EndpointFailure};
pub use runner::{CycleReport, EndpointOutcome, EndpointReport, Scheduler};
