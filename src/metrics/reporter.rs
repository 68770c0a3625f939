//! Metrics reporter - writes dispatched metrics to an output stream
//!
//! Supports multiple output formats:
//! - collectd exec-plugin `PUTVAL` lines
//! - JSON lines
//! - Console (human-readable)

use std::io::{self, Write};
use std::time::Duration;

use clap::ValueEnum;
use parking_lot::Mutex;
use tracing::error;

use super::dispatch::{Metric, MetricSink};

/// Plugin name used in collectd identifiers
pub const PLUGIN_NAME: &str = "redis_info";

/// Output format for metrics
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// collectd exec plugin protocol
    #[default]
    Putval,
    /// One JSON object per line
    Json,
    Console,
}

/// Metrics reporter
pub struct MetricsReporter {
    format: OutputFormat,
    hostname: String,
    interval: Duration,
    out: Mutex<Box<dyn Write + Send>>,
}

impl MetricsReporter {
    /// Create new reporter writing to `out`
    pub fn new(
        format: OutputFormat,
        hostname: &str,
        interval: Duration,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            format,
            hostname: hostname.to_string(),
            interval,
            out: Mutex::new(out),
        }
    }

    /// Create new reporter writing to stdout
    pub fn stdout(format: OutputFormat, hostname: &str, interval: Duration) -> Self {
        Self::new(format, hostname, interval, Box::new(io::stdout()))
    }

    /// Render one metric in the configured format
    pub fn format_metric(&self, metric: &Metric) -> String {
        match self.format {
            OutputFormat::Putval => format!(
                "PUTVAL \"{}/{}-{}/{}-{}\" interval={} N:{}",
                self.hostname,
                PLUGIN_NAME,
                sanitize(&metric.instance),
                metric.kind,
                sanitize(&metric.type_instance()),
                self.interval.as_secs().max(1),
                metric.value
            ),
            OutputFormat::Json => match serde_json::to_string(metric) {
                Ok(json) => json,
                Err(e) => format!("{{\"error\":\"{}\"}}", e),
            },
            OutputFormat::Console => format!(
                "{:<24} {:<40} {:<8} {}",
                metric.instance,
                metric.type_instance(),
                metric.kind,
                metric.value
            ),
        }
    }
}

impl MetricSink for MetricsReporter {
    fn dispatch(&self, metric: &Metric) {
        let line = self.format_metric(metric);
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            error!("Failed to write metric {}: {}", metric.type_instance(), e);
        }
    }
}

/// collectd identifiers use `/` as separator and quote the whole thing
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c == '/' || c == '"' || c.is_whitespace() { '_' } else { c })
        .collect()
}
