//! redis-info-collector - periodic INFO metrics for Redis-compatible servers
//!
//! Metrics go to stdout (collectd exec `PUTVAL` lines by default); logs go
//! to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use redis_info_collector::config::{CliArgs, CollectorConfig};
use redis_info_collector::metrics::MetricsReporter;
use redis_info_collector::scheduler::Scheduler;

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose, args.quiet)?;

    let config = CollectorConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    for endpoint in &config.endpoints {
        info!(
            "Collecting {} from {}:{} (sections: {:?}, {} metrics, using_auth={})",
            endpoint.instance_label(),
            endpoint.host,
            endpoint.port,
            endpoint.sections(),
            endpoint.metrics.len(),
            endpoint.auth.is_some()
        );
    }

    let interval = config.interval();
    let reporter = MetricsReporter::stdout(args.format, &args.hostname, interval);
    let scheduler = Scheduler::new(config.endpoints);

    let cycles = scheduler.run(interval, args.max_cycles(), &reporter);
    info!("Finished after {} cycles", cycles);

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
