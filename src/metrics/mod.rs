//! Metric selection, conversion and dispatch
//!
//! This module provides:
//! - Numeric conversion of INFO values
//! - Per-endpoint metric selections and the built-in default list
//! - Resolution of a selection against a merged namespace
//! - Sinks: in-memory collection and PUTVAL/JSON/console output

pub mod dispatch;
pub mod numeric;
pub mod reporter;
pub mod selection;

pub use dispatch::{
    dispatch_metrics, resolve_metrics, CollectingSink, DispatchSummary, Metric, MetricSink,
    Resolved,
};
pub use numeric::{parse_numeric, MetricValue, Numeric};
pub use reporter::{MetricsReporter, OutputFormat};
pub use selection::{
    default_metric_selection, public_name, MetricKind, MetricSource, MetricSpec,
};
