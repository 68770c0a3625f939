//! Resolving a selection against a namespace and handing metrics to a sink

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::numeric::{parse_numeric, MetricValue};
use super::selection::{MetricKind, MetricSource, MetricSpec};
use crate::info::StatusMap;

/// One exported value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Logical measurement name
    pub name: String,
    /// Which monitored endpoint
    pub instance: String,
    /// Record the value came from (`db0`, `slave1`), if any
    pub sub_label: Option<String>,
    pub kind: MetricKind,
    pub value: MetricValue,
}

impl Metric {
    /// collectd-style type instance: `name`, or `record-name` for records
    pub fn type_instance(&self) -> String {
        match &self.sub_label {
            Some(sub) => format!("{}-{}", sub, self.name),
            None => self.name.clone(),
        }
    }
}

/// Downstream consumer of metrics
///
/// Shared by every endpoint worker of a cycle, hence `Sync`.
pub trait MetricSink: Send + Sync {
    fn dispatch(&self, metric: &Metric);
}

/// Sink that keeps every metric in memory
#[derive(Default)]
pub struct CollectingSink {
    metrics: Mutex<Vec<Metric>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything dispatched so far
    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().clone()
    }

    /// Drain everything dispatched so far
    pub fn take(&self) -> Vec<Metric> {
        std::mem::take(&mut *self.metrics.lock())
    }

    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }
}

impl MetricSink for CollectingSink {
    fn dispatch(&self, metric: &Metric) {
        self.metrics.lock().push(metric.clone());
    }
}

/// Counts for one endpoint's dispatch step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub skipped: usize,
}

/// Metrics resolved from a selection, in selection order
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub metrics: Vec<Metric>,
    /// Selected values that were missing or not numeric
    pub skipped: usize,
}

/// Evaluate `selection` against `map`.
///
/// Missing keys and unparseable values are logged and counted, never
/// fatal. Output follows selection order; prefix and record matches come
/// out in key order.
pub fn resolve_metrics(map: &StatusMap, selection: &[MetricSpec], instance: &str) -> Resolved {
    let mut resolver = Resolver {
        instance,
        resolved: Resolved::default(),
    };

    for spec in selection {
        match &spec.source {
            MetricSource::Key(key) => match map.lookup(key) {
                Some(raw) => resolver.push(spec, key, spec.metric_name(key), None, raw),
                None => {
                    if spec.optional {
                        debug!("Info key not found: {}", key);
                    } else {
                        warn!("Info key not found: {}", key);
                        resolver.resolved.skipped += 1;
                    }
                }
            },
            MetricSource::Prefix(prefix) => {
                for (key, raw) in map.scalars_with_prefix(prefix) {
                    resolver.push(spec, key, spec.metric_name(key), None, raw);
                }
            }
            MetricSource::Records { prefix, field } => {
                for (record_key, record) in map.records(prefix) {
                    match record.get(field) {
                        Some(raw) => resolver.push(
                            spec,
                            field,
                            spec.metric_name(field),
                            Some(record_key),
                            raw,
                        ),
                        None => {
                            if spec.optional {
                                debug!("Info key not found: {}_{}", record_key, field);
                            } else {
                                warn!("Info key not found: {}_{}", record_key, field);
                                resolver.resolved.skipped += 1;
                            }
                        }
                    }
                }
            }
        }
    }

    resolver.resolved
}

struct Resolver<'a> {
    instance: &'a str,
    resolved: Resolved,
}

impl Resolver<'_> {
    fn push(&mut self, spec: &MetricSpec, key: &str, name: &str, sub: Option<&str>, raw: &str) {
        match parse_numeric(raw).value() {
            Some(value) => self.resolved.metrics.push(Metric {
                name: name.to_string(),
                instance: self.instance.to_string(),
                sub_label: sub.map(str::to_string),
                kind: spec.kind,
                value,
            }),
            None => {
                warn!(
                    "Value of {}{} is not numeric: {}",
                    sub.map(|s| format!("{}_", s)).unwrap_or_default(),
                    key,
                    raw
                );
                self.resolved.skipped += 1;
            }
        }
    }
}

/// Hand every resolved metric to `sink`
pub fn dispatch_metrics(resolved: &Resolved, sink: &dyn MetricSink, verbose: bool) -> DispatchSummary {
    for metric in &resolved.metrics {
        if verbose {
            info!("Sending value: {}={}", metric.type_instance(), metric.value);
        } else {
            debug!("Sending value: {}={}", metric.type_instance(), metric.value);
        }
        sink.dispatch(metric);
    }

    DispatchSummary {
        dispatched: resolved.metrics.len(),
        skipped: resolved.skipped,
    }
}
