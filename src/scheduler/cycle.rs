//! One endpoint's collection cycle
//!
//! `Idle -> Fetching -> Merging -> Deriving -> Dispatching -> Idle`. Any
//! failure before dispatching ends the cycle for that endpoint only.

use std::fmt;

use tracing::{debug, info};

use crate::client::{ControlPlane, ControlPlaneExt};
use crate::config::EndpointConfig;
use crate::info::{derive_fields, fetch_sections, Namespace};
use crate::metrics::{dispatch_metrics, resolve_metrics, DispatchSummary, MetricSink};
use crate::utils::{CollectorError, Result};

/// Where an endpoint is within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStage {
    Idle,
    /// Connect, AUTH and section requests
    Fetching,
    Merging,
    Deriving,
    Dispatching,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStage::Idle => "idle",
            CycleStage::Fetching => "fetching",
            CycleStage::Merging => "merging",
            CycleStage::Deriving => "deriving",
            CycleStage::Dispatching => "dispatching",
        }
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an endpoint produced no metrics this cycle
#[derive(Debug)]
pub struct EndpointFailure {
    pub stage: CycleStage,
    pub error: CollectorError,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

/// State machine for one endpoint, one cycle
pub struct EndpointCycle<'a> {
    endpoint: &'a EndpointConfig,
    instance: String,
    stage: CycleStage,
}

impl<'a> EndpointCycle<'a> {
    pub fn new(endpoint: &'a EndpointConfig) -> Self {
        Self {
            endpoint,
            instance: endpoint.instance_label(),
            stage: CycleStage::Idle,
        }
    }

    fn advance(&mut self, stage: CycleStage) {
        debug!("{}: {} -> {}", self.instance, self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, error: CollectorError) -> EndpointFailure {
        let failure = EndpointFailure {
            stage: self.stage,
            error,
        };
        self.stage = CycleStage::Idle;
        failure
    }

    /// Run the cycle, opening the connection with `connect`.
    ///
    /// The connection lives until the cycle returns.
    pub fn run<C, F>(
        mut self,
        connect: F,
        sink: &dyn MetricSink,
    ) -> std::result::Result<DispatchSummary, EndpointFailure>
    where
        C: ControlPlane,
        F: FnOnce(&EndpointConfig) -> Result<C>,
    {
        let endpoint = self.endpoint;
        let verbose = endpoint.verbose;

        self.advance(CycleStage::Fetching);
        if verbose {
            info!("Connecting to {}:{}", endpoint.host, endpoint.port);
        } else {
            debug!("Connecting to {}:{}", endpoint.host, endpoint.port);
        }
        let mut conn = connect(endpoint).map_err(|e| self.fail(e))?;

        if let Some(password) = &endpoint.auth {
            conn.authenticate(password).map_err(|e| self.fail(e))?;
        }

        let sections = endpoint.sections();
        let fetched = fetch_sections(&mut conn, &sections).map_err(|e| self.fail(e))?;
        drop(conn);

        self.advance(CycleStage::Merging);
        let mut namespace = Namespace::from_sections(fetched);

        self.advance(CycleStage::Deriving);
        let derived = derive_fields(namespace.map_mut());
        debug!(
            "{}: {} keys from {:?}, {} aliases, {} replica delays",
            self.instance,
            namespace.map().len(),
            namespace.sections(),
            derived.aliases,
            derived.replica_delays
        );

        self.advance(CycleStage::Dispatching);
        let resolved = resolve_metrics(namespace.map(), &endpoint.metrics, &self.instance);
        let summary = dispatch_metrics(&resolved, sink, verbose);

        self.advance(CycleStage::Idle);
        Ok(summary)
    }
}
