//! network-health -- ping and iperf health checks with metric submission.
//!
//! This crate runs the system `ping` and `iperf` tools, parses their text
//! output into flat metric sets, normalizes those into timestamped series and
//! submits them to a metrics intake API.

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod platform;
pub mod probes;
pub mod report;
pub mod runner;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

use crate::backend::MetricsClient;
use crate::platform::Platform;
use crate::probes::{ProbeKind, RawMetricSet, TestScope, TestType};
use crate::runner::CommandRunner;

pub use crate::error::Result;

/// Targets and parameters for one run. Unset targets are skipped.
#[derive(Debug, Clone)]
pub struct CheckPlan {
    pub ping_host: Option<String>,
    pub remote_ping_host: Option<String>,
    pub iperf_host: Option<String>,
    pub remote_iperf_host: Option<String>,
    pub packet_count: u32,
    pub local_iperf_port: Option<u16>,
    pub remote_iperf_port: Option<u16>,
}

/// A single scheduled test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub test_type: TestType,
    pub target: String,
    pub port: Option<u16>,
}

impl Default for CheckPlan {
    fn default() -> Self {
        Self {
            ping_host: None,
            remote_ping_host: None,
            iperf_host: None,
            remote_iperf_host: None,
            packet_count: probes::ping::DEFAULT_PACKET_COUNT,
            local_iperf_port: None,
            remote_iperf_port: None,
        }
    }
}

impl CheckPlan {
    /// Checks in run order: local ping, remote ping, local iperf, remote iperf.
    pub fn checks(&self) -> Vec<Check> {
        let candidates = [
            (ProbeKind::Ping, TestScope::Local, &self.ping_host, None),
            (ProbeKind::Ping, TestScope::Remote, &self.remote_ping_host, None),
            (ProbeKind::Bandwidth, TestScope::Local, &self.iperf_host, self.local_iperf_port),
            (
                ProbeKind::Bandwidth,
                TestScope::Remote,
                &self.remote_iperf_host,
                self.remote_iperf_port,
            ),
        ];
        candidates
            .into_iter()
            .filter_map(|(kind, scope, target, port)| {
                target.as_ref().map(|t| Check {
                    test_type: TestType::new(kind, scope),
                    target: t.clone(),
                    port,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.checks().is_empty()
    }
}

/// Result of one check.
#[derive(Debug, Serialize)]
pub struct TestOutcome {
    pub test_type: TestType,
    pub target: String,
    pub metrics: Option<RawMetricSet>,
    pub submitted: bool,
    pub probe_error: Option<String>,
    pub submit_error: Option<String>,
}

impl TestOutcome {
    pub fn succeeded(&self) -> bool {
        self.probe_error.is_none() && self.submit_error.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub platform: Platform,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(TestOutcome::succeeded)
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Run one probe and return its raw metric set.
pub async fn run_probe(
    runner: &dyn CommandRunner,
    check: &Check,
    packet_count: u32,
    platform: Platform,
) -> Result<RawMetricSet> {
    match check.test_type.kind() {
        ProbeKind::Ping => probes::ping::run_ping(runner, &check.target, packet_count, platform).await,
        ProbeKind::Bandwidth => {
            probes::iperf::run_bandwidth(runner, &check.target, check.port, platform).await
        }
    }
}

/// Run every check in `plan`, one after another.
///
/// When `client` is given, each check's metrics are submitted right after its
/// own parse completes. A failed probe or submission is recorded in its
/// outcome and the run moves on to the next check.
pub async fn run_checks(
    plan: &CheckPlan,
    runner: &dyn CommandRunner,
    client: Option<&MetricsClient>,
    platform: Platform,
) -> RunReport {
    let started_at = Utc::now();
    let mut outcomes = Vec::new();

    if client.is_none() {
        info!("metric submission is disabled");
    }

    for check in plan.checks() {
        let span = info_span!("check", test_type = %check.test_type, host = %check.target);
        let outcome = run_check(&check, plan.packet_count, runner, client, platform)
            .instrument(span)
            .await;
        outcomes.push(outcome);
    }

    info!(checks = outcomes.len(), "completed");
    RunReport {
        platform,
        started_at,
        outcomes,
    }
}

async fn run_check(
    check: &Check,
    packet_count: u32,
    runner: &dyn CommandRunner,
    client: Option<&MetricsClient>,
    platform: Platform,
) -> TestOutcome {
    info!("starting {} test", check.test_type);
    let mut outcome = TestOutcome {
        test_type: check.test_type,
        target: check.target.clone(),
        metrics: None,
        submitted: false,
        probe_error: None,
        submit_error: None,
    };

    let metrics = match run_probe(runner, check, packet_count, platform).await {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(error = %e, "test failed");
            outcome.probe_error = Some(e.to_string());
            return outcome;
        }
    };

    if let Some(client) = client {
        match client.submit_metrics(&metrics, check.test_type).await {
            Ok(()) => outcome.submitted = true,
            Err(e) => {
                error!(error = %e, "metric submission failed");
                outcome.submit_error = Some(e.to_string());
            }
        }
    }

    outcome.metrics = Some(metrics);
    outcome
}
