//! Endpoint scheduler
//!
//! Runs every endpoint's cycle concurrently, one scoped worker thread per
//! endpoint, and repeats at a fixed interval.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::cycle::{CycleStage, EndpointCycle, EndpointFailure};
use crate::client::RawConnection;
use crate::config::EndpointConfig;
use crate::metrics::{DispatchSummary, MetricSink};
use crate::utils::{CollectorError, Result};

/// Result of one endpoint in one cycle
#[derive(Debug)]
pub enum EndpointOutcome {
    Completed(DispatchSummary),
    Failed(EndpointFailure),
    /// The endpoint's previous cycle was still running
    Skipped,
}

#[derive(Debug)]
pub struct EndpointReport {
    pub instance: String,
    pub outcome: EndpointOutcome,
}

/// Outcome of every endpoint for one cycle, in configuration order
#[derive(Debug, Default)]
pub struct CycleReport {
    pub endpoints: Vec<EndpointReport>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn outcome(&self, instance: &str) -> Option<&EndpointOutcome> {
        self.endpoints
            .iter()
            .find(|r| r.instance == instance)
            .map(|r| &r.outcome)
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Completed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EndpointOutcome::Skipped))
    }

    /// Metrics dispatched across all endpoints
    pub fn dispatched(&self) -> usize {
        self.endpoints
            .iter()
            .map(|r| match &r.outcome {
                EndpointOutcome::Completed(summary) => summary.dispatched,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&EndpointOutcome) -> bool) -> usize {
        self.endpoints.iter().filter(|r| pred(&r.outcome)).count()
    }
}

struct EndpointSlot {
    config: EndpointConfig,
    instance: String,
    /// Held for the duration of the endpoint's cycle
    busy: Mutex<()>,
}

/// Drives collection cycles over a fixed set of endpoints
pub struct Scheduler {
    slots: Vec<EndpointSlot>,
}

impl Scheduler {
    pub fn new(endpoints: Vec<EndpointConfig>) -> Self {
        let slots = endpoints
            .into_iter()
            .map(|config| EndpointSlot {
                instance: config.instance_label(),
                config,
                busy: Mutex::new(()),
            })
            .collect();
        Self { slots }
    }

    /// Collect every endpoint once and wait for all of them
    pub fn run_cycle(&self, sink: &dyn MetricSink) -> CycleReport {
        let start = Instant::now();

        let endpoints = thread::scope(|scope| {
            let handles: Vec<_> = self
                .slots
                .iter()
                .map(|slot| {
                    let handle = thread::Builder::new()
                        .name(format!("collect-{}", slot.instance))
                        .spawn_scoped(scope, move || collect_slot(slot, sink));
                    (slot, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(slot, handle)| {
                    let outcome = match handle {
                        Ok(handle) => handle.join().unwrap_or_else(|_| {
                            worker_failure(io::Error::new(
                                io::ErrorKind::Other,
                                "collector thread panicked",
                            ))
                        }),
                        Err(e) => worker_failure(e),
                    };
                    EndpointReport {
                        instance: slot.instance.clone(),
                        outcome,
                    }
                })
                .collect()
        });

        CycleReport {
            endpoints,
            elapsed: start.elapsed(),
        }
    }

    /// Run cycles every `interval` until `max_cycles` (forever if `None`).
    ///
    /// A cycle that overruns the interval is followed immediately by the
    /// next one. Returns the number of cycles run.
    pub fn run(&self, interval: Duration, max_cycles: Option<u64>, sink: &dyn MetricSink) -> u64 {
        let mut cycles = 0u64;
        loop {
            let start = Instant::now();
            let report = self.run_cycle(sink);
            cycles += 1;
            log_report(cycles, &report);

            if max_cycles.is_some_and(|max| cycles >= max) {
                return cycles;
            }

            let elapsed = start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            } else {
                warn!(
                    "Cycle {} took {:?}, longer than the {:?} interval",
                    cycles, elapsed, interval
                );
            }
        }
    }
}

fn collect_slot(slot: &EndpointSlot, sink: &dyn MetricSink) -> EndpointOutcome {
    let Some(_busy) = slot.busy.try_lock() else {
        warn!("{}: previous cycle still running, skipping", slot.instance);
        return EndpointOutcome::Skipped;
    };

    match EndpointCycle::new(&slot.config).run(connect, sink) {
        Ok(summary) => {
            debug!(
                "{}: dispatched {}, skipped {}",
                slot.instance, summary.dispatched, summary.skipped
            );
            EndpointOutcome::Completed(summary)
        }
        Err(failure) => {
            warn!("{}: {}", slot.instance, failure);
            EndpointOutcome::Failed(failure)
        }
    }
}

fn connect(endpoint: &EndpointConfig) -> Result<RawConnection> {
    Ok(RawConnection::connect_tcp(
        &endpoint.host,
        endpoint.port,
        endpoint.connect_timeout(),
        endpoint.read_timeout(),
    )?)
}

fn worker_failure(error: io::Error) -> EndpointOutcome {
    EndpointOutcome::Failed(EndpointFailure {
        stage: CycleStage::Idle,
        error: CollectorError::Io(error),
    })
}

fn log_report(cycle: u64, report: &CycleReport) {
    if report.failed() > 0 || report.skipped() > 0 {
        warn!(
            "Cycle {}: {} ok, {} failed, {} skipped, {} metrics in {:?}",
            cycle,
            report.completed(),
            report.failed(),
            report.skipped(),
            report.dispatched(),
            report.elapsed
        );
    } else {
        info!(
            "Cycle {}: {} endpoints, {} metrics in {:?}",
            cycle,
            report.completed(),
            report.dispatched(),
            report.elapsed
        );
    }
}
