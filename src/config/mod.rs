//! Configuration module

pub mod cli;
pub mod collector_config;

pub use cli::CliArgs;
pub use collector_config::{
    CollectorConfig, EndpointConfig, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_INTERVAL_SECS,
    DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS,
};
