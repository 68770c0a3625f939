//! Collector configuration
//!
//! Built once at startup, from a YAML file or from CLI flags, and handed to
//! the scheduler by value. Nothing here changes after load.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::cli::CliArgs;
use crate::info::Section;
use crate::metrics::{default_metric_selection, MetricSpec};
use crate::utils::{CollectorError, Result};

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;

/// One monitored instance
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Password sent with AUTH before the first command
    #[serde(default)]
    pub auth: Option<String>,
    /// Instance label; `host:port` when absent
    #[serde(default)]
    pub instance: Option<String>,
    /// Log connection and value traces at INFO instead of DEBUG
    #[serde(default)]
    pub verbose: bool,
    /// Also fetch `INFO commandstats`
    #[serde(default)]
    pub command_stats: bool,
    /// Also fetch `CLUSTER INFO`
    #[serde(default)]
    pub cluster_info: bool,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_metric_selection")]
    pub metrics: Vec<MetricSpec>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl EndpointConfig {
    /// Endpoint with defaults for everything but the address
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            auth: None,
            instance: None,
            verbose: false,
            command_stats: false,
            cluster_info: false,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            metrics: default_metric_selection(),
        }
    }

    /// Label identifying this endpoint's metrics
    pub fn instance_label(&self) -> String {
        match &self.instance {
            Some(label) => label.clone(),
            None => format!("{}:{}", self.host, self.port),
        }
    }

    /// Sections fetched each cycle, in merge order
    pub fn sections(&self) -> Vec<Section> {
        Section::plan(self.command_stats, self.cluster_info)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err(format!("{}: port must not be 0", self.host));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(format!(
                "{}: timeouts must be at least 1ms",
                self.instance_label()
            ));
        }
        if matches!(&self.instance, Some(label) if label.trim().is_empty()) {
            return Err(format!("{}: instance must not be empty", self.host));
        }
        if self.metrics.is_empty() {
            return Err(format!(
                "{}: metrics list is empty (omit it to use the defaults)",
                self.instance_label()
            ));
        }
        Ok(())
    }
}

// Keeps the password out of logs
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("using_auth", &self.auth.is_some())
            .field("instance", &self.instance)
            .field("verbose", &self.verbose)
            .field("command_stats", &self.command_stats)
            .field("cluster_info", &self.cluster_info)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("metrics", &self.metrics.len())
            .finish()
    }
}

/// Complete collector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    pub endpoints: Vec<EndpointConfig>,
}

impl CollectorConfig {
    /// Parse and validate YAML configuration
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CollectorConfig = serde_yaml::from_str(yaml)
            .map_err(|e| CollectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CollectorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        args.validate().map_err(CollectorError::Config)?;

        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let hosts = if args.hosts.is_empty() {
                    vec!["127.0.0.1".to_string()]
                } else {
                    args.hosts.clone()
                };
                let endpoints = hosts
                    .iter()
                    .map(|host| {
                        let mut endpoint = EndpointConfig::new(host, args.port);
                        endpoint.auth = args.password.clone();
                        endpoint.instance = args.instance.clone();
                        endpoint.verbose = args.verbose;
                        endpoint.command_stats = args.command_stats;
                        endpoint.cluster_info = args.cluster_info;
                        endpoint.connect_timeout_ms = args.connect_timeout_ms;
                        endpoint.read_timeout_ms = args.read_timeout_ms;
                        endpoint
                    })
                    .collect();
                CollectorConfig {
                    interval_secs: DEFAULT_INTERVAL_SECS,
                    endpoints,
                }
            }
        };

        if let Some(interval) = args.interval {
            config.interval_secs = interval;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(CollectorError::Config(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        if self.endpoints.is_empty() {
            return Err(CollectorError::Config(
                "at least one endpoint is required".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        for endpoint in &self.endpoints {
            endpoint.validate().map_err(CollectorError::Config)?;
            let label = endpoint.instance_label();
            if !labels.insert(label.clone()) {
                return Err(CollectorError::Config(format!(
                    "duplicate instance label: {}",
                    label
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;
    use clap::Parser;
    use std::io::Write;

    const FULL_CONFIG: &str = r#"
interval_secs: 30
endpoints:
  - host: 10.0.0.5
    port: 6380
    auth: secret
    instance: sessions
    verbose: true
    command_stats: true
    cluster_info: true
    connect_timeout_ms: 500
    read_timeout_ms: 1500
    metrics:
      - key: used_memory
        kind: bytes
      - records: db
        field: keys
        kind: gauge
  - host: cache.internal
"#;

    #[test]
    fn test_full_config() {
        let config = CollectorConfig::from_yaml(FULL_CONFIG).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.endpoints.len(), 2);

        let first = &config.endpoints[0];
        assert_eq!(first.instance_label(), "sessions");
        assert_eq!(first.auth.as_deref(), Some("secret"));
        assert_eq!(
            first.sections(),
            vec![Section::Primary, Section::CommandStats, Section::Cluster]
        );
        assert_eq!(first.metrics.len(), 2);
        assert_eq!(first.metrics[0], MetricSpec::bytes("used_memory"));
        assert_eq!(first.read_timeout(), Duration::from_millis(1500));

        let second = &config.endpoints[1];
        assert_eq!(second.port, DEFAULT_PORT);
        assert_eq!(second.instance_label(), "cache.internal:6379");
        assert_eq!(second.metrics, default_metric_selection());
        assert_eq!(second.sections(), vec![Section::Primary]);
    }

    #[test]
    fn test_selection_is_per_endpoint() {
        let config = CollectorConfig::from_yaml(FULL_CONFIG).unwrap();
        assert_ne!(config.endpoints[0].metrics, config.endpoints[1].metrics);
        assert!(config.endpoints[0]
            .metrics
            .iter()
            .all(|m| m.kind != MetricKind::Counter));
    }

    #[test]
    fn test_rejects_unknown_endpoint_option() {
        let yaml = "endpoints:\n  - host: a\n    redis_extra_metric: gauge\n";
        assert!(matches!(
            CollectorConfig::from_yaml(yaml),
            Err(CollectorError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_metric_entry() {
        let yaml = "endpoints:\n  - host: a\n    metrics:\n      - key: x\n        kind: rate\n";
        assert!(CollectorConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(CollectorConfig::from_yaml("endpoints: []\n").is_err());
        assert!(CollectorConfig::from_yaml("endpoints:\n  - host: ''\n").is_err());
        assert!(CollectorConfig::from_yaml("endpoints:\n  - host: a\n    port: 0\n").is_err());
        assert!(
            CollectorConfig::from_yaml("endpoints:\n  - host: a\n    metrics: []\n").is_err()
        );
        assert!(CollectorConfig::from_yaml(
            "interval_secs: 0\nendpoints:\n  - host: a\n"
        )
        .is_err());
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let yaml = "endpoints:\n  - host: a\n  - host: a\n";
        assert!(CollectorConfig::from_yaml(yaml).is_err());
        let yaml = "endpoints:\n  - host: a\n  - host: a\n    port: 6380\n";
        assert!(CollectorConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();
        let config = CollectorConfig::load(file.path()).unwrap();
        assert_eq!(config.endpoints.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CollectorConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_from_cli_hosts() {
        let args = CliArgs::parse_from([
            "test",
            "-h",
            "a",
            "-h",
            "b",
            "-p",
            "6380",
            "-a",
            "pw",
            "--command-stats",
        ]);
        let config = CollectorConfig::from_cli(&args).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].instance_label(), "b:6380");
        assert!(config.endpoints[0].command_stats);
        assert_eq!(config.endpoints[0].auth.as_deref(), Some("pw"));
        assert_eq!(config.interval_secs, DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn test_from_cli_config_file_with_interval_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let args = CliArgs::parse_from(["test", "--config", &path, "--interval", "5"]);
        let config = CollectorConfig::from_cli(&args).unwrap();
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.endpoints[0].instance_label(), "sessions");
    }

    #[test]
    fn test_debug_hides_password() {
        let mut endpoint = EndpointConfig::new("a", 1);
        endpoint.auth = Some("hunter2".to_string());
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("using_auth: true"));
    }
}
