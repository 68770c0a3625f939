//! Metric selection: which namespace fields to export, and how
//!
//! Each endpoint carries an ordered list of [`MetricSpec`]s. A spec names
//! its source (one key, every scalar under a prefix, or one field of every
//! record under a prefix), the metric kind, and optionally a public name.
//! Selections are validated when configuration is loaded and evaluated
//! fresh against every cycle's namespace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of a dispatched value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing
    Counter,
    /// Point-in-time
    Gauge,
    /// Size in bytes
    Bytes,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a metric's values come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSource {
    /// One key: a scalar, or a record field addressed as `parent_sub`
    Key(String),
    /// Every scalar whose key starts with the prefix
    Prefix(String),
    /// Field `field` of every record whose key starts with `prefix`
    Records { prefix: String, field: String },
}

/// Public names for counters whose INFO key differs from the name
/// monitoring dashboards expect
pub const BUILTIN_RENAMES: &[(&str, &str)] = &[
    ("total_commands_processed", "commands_processed"),
    ("total_connections_received", "connections_received"),
];

/// Exported name of an INFO key when no rename is configured
pub fn public_name(key: &str) -> &str {
    BUILTIN_RENAMES
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
        .unwrap_or(key)
}

/// One entry of an endpoint's metric selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMetricSpec")]
pub struct MetricSpec {
    pub source: MetricSource,
    pub kind: MetricKind,
    /// Exported name, overriding the key (or record field) name
    pub rename: Option<String>,
    /// Absence is expected (role-dependent keys); logged at debug only
    pub optional: bool,
}

impl MetricSpec {
    pub fn new(source: MetricSource, kind: MetricKind) -> Self {
        Self {
            source,
            kind,
            rename: None,
            optional: false,
        }
    }

    pub fn key(key: &str, kind: MetricKind) -> Self {
        Self::new(MetricSource::Key(key.to_string()), kind)
    }

    pub fn gauge(key: &str) -> Self {
        Self::key(key, MetricKind::Gauge)
    }

    pub fn counter(key: &str) -> Self {
        Self::key(key, MetricKind::Counter)
    }

    pub fn bytes(key: &str) -> Self {
        Self::key(key, MetricKind::Bytes)
    }

    pub fn prefix(prefix: &str, kind: MetricKind) -> Self {
        Self::new(MetricSource::Prefix(prefix.to_string()), kind)
    }

    pub fn records(prefix: &str, field: &str, kind: MetricKind) -> Self {
        Self::new(
            MetricSource::Records {
                prefix: prefix.to_string(),
                field: field.to_string(),
            },
            kind,
        )
    }

    // Builder methods
    pub fn renamed(mut self, name: &str) -> Self {
        self.rename = Some(name.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Name a metric read from `key` is exported under
    pub fn metric_name<'a>(&'a self, key: &'a str) -> &'a str {
        match &self.rename {
            Some(name) => name,
            None => public_name(key),
        }
    }
}

/// Built-in selection used when an endpoint configures none
pub fn default_metric_selection() -> Vec<MetricSpec> {
    vec![
        MetricSpec::gauge("uptime_in_seconds"),
        MetricSpec::gauge("connected_clients"),
        MetricSpec::gauge("connected_slaves"),
        MetricSpec::gauge("blocked_clients"),
        MetricSpec::gauge("evicted_keys"),
        MetricSpec::bytes("used_memory"),
        MetricSpec::gauge("changes_since_last_save"),
        MetricSpec::counter("total_connections_received"),
        MetricSpec::counter("total_commands_processed"),
        // Replication, present on primaries or replicas only
        MetricSpec::gauge("master_repl_offset").optional(),
        MetricSpec::gauge("master_last_io_seconds_ago").optional(),
        MetricSpec::gauge("slave_repl_offset").optional(),
        MetricSpec::prefix("repl_", MetricKind::Gauge),
        MetricSpec::prefix("vm_stats_", MetricKind::Gauge),
        // Keyspace and per-replica rows
        MetricSpec::records("db", "keys", MetricKind::Gauge),
        MetricSpec::records("slave", "delay", MetricKind::Gauge),
        MetricSpec::records("replica", "delay", MetricKind::Gauge),
    ]
}

/// Configuration form of a [`MetricSpec`], validated on conversion
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMetricSpec {
    key: Option<String>,
    prefix: Option<String>,
    records: Option<String>,
    field: Option<String>,
    kind: MetricKind,
    rename: Option<String>,
    #[serde(default)]
    optional: bool,
}

impl TryFrom<RawMetricSpec> for MetricSpec {
    type Error = String;

    fn try_from(raw: RawMetricSpec) -> Result<Self, Self::Error> {
        let source = match (raw.key, raw.prefix, raw.records) {
            (Some(key), None, None) => MetricSource::Key(non_empty("key", key)?),
            (None, Some(prefix), None) => MetricSource::Prefix(non_empty("prefix", prefix)?),
            (None, None, Some(prefix)) => {
                let field = raw
                    .field
                    .ok_or_else(|| format!("records '{}' requires a field", prefix))?;
                return Ok(MetricSpec {
                    source: MetricSource::Records {
                        prefix: non_empty("records", prefix)?,
                        field: non_empty("field", field)?,
                    },
                    kind: raw.kind,
                    rename: raw.rename.map(|r| non_empty("rename", r)).transpose()?,
                    optional: raw.optional,
                });
            }
            (None, None, None) => {
                return Err("metric needs one of key, prefix or records".to_string())
            }
            _ => return Err("metric must set only one of key, prefix or records".to_string()),
        };

        if raw.field.is_some() {
            return Err("field is only valid together with records".to_string());
        }

        Ok(MetricSpec {
            source,
            kind: raw.kind,
            rename: raw.rename.map(|r| non_empty("rename", r)).transpose()?,
            optional: raw.optional,
        })
    }
}

fn non_empty(what: &str, value: String) -> Result<String, String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", what))
    } else {
        Ok(value)
    }
}
