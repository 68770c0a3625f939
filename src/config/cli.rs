//! Command-line argument parsing
//!
//! Either `--config <file>` or ad-hoc endpoint flags. Host flags may repeat;
//! every host shares the remaining endpoint flags.

use clap::Parser;
use std::path::PathBuf;

use crate::metrics::OutputFormat;

/// Periodic Redis INFO collector
#[derive(Parser, Debug, Clone)]
#[command(name = "redis-info-collector")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct CliArgs {
    /// Print help information
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: (),

    /// YAML configuration file (replaces the endpoint flags)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    // ===== Endpoint Options =====
    /// Server hostname (can be specified multiple times)
    #[arg(short = 'h', long = "host", action = clap::ArgAction::Append)]
    pub hosts: Vec<String>,

    /// Server port
    #[arg(short = 'p', long = "port", default_value_t = 6379)]
    pub port: u16,

    /// Password for AUTH command
    #[arg(short = 'a', long = "auth")]
    pub password: Option<String>,

    /// Instance label (default: host:port)
    #[arg(long = "instance")]
    pub instance: Option<String>,

    /// Also collect INFO commandstats
    #[arg(long = "command-stats")]
    pub command_stats: bool,

    /// Also collect CLUSTER INFO
    #[arg(long = "cluster-info")]
    pub cluster_info: bool,

    /// Connect timeout in milliseconds
    #[arg(long = "connect-timeout", default_value_t = 2000)]
    pub connect_timeout_ms: u64,

    /// Read/write timeout in milliseconds
    #[arg(long = "read-timeout", default_value_t = 5000)]
    pub read_timeout_ms: u64,

    // ===== Schedule =====
    /// Seconds between collection cycles (overrides the config file)
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Stop after N cycles
    #[arg(short = 'n', long = "cycles")]
    pub cycles: Option<u64>,

    // ===== Output =====
    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Putval)]
    pub format: OutputFormat,

    /// Host name used in PUTVAL identifiers
    #[arg(long = "hostname", env = "COLLECTD_HOSTNAME", default_value = "localhost")]
    pub hostname: String,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl CliArgs {
    /// Number of cycles to run, `None` for unbounded
    pub fn max_cycles(&self) -> Option<u64> {
        if self.once {
            Some(1)
        } else {
            self.cycles
        }
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.config.is_some() && (!self.hosts.is_empty() || self.password.is_some()) {
            return Err("--config cannot be combined with --host or --auth".to_string());
        }

        if self.once && self.cycles.is_some() {
            return Err("--once and --cycles are mutually exclusive".to_string());
        }

        if self.cycles == Some(0) {
            return Err("--cycles must be at least 1".to_string());
        }

        if self.interval == Some(0) {
            return Err("--interval must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        Ok(())
    }
}
