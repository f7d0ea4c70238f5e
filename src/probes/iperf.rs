//! iperf process wrapper: build the client command, run it, read the summary line.
//!
//! Only one extraction strategy exists. The parser looks for the interval
//! summary line that iperf prints per stream (`[  3]`) or for the aggregate
//! (`[SUM]`), with an interval that starts at zero, e.g.
//!
//! ```text
//! [  3]  0.0-10.0 sec  1120 MBytes   112 MBytes/sec
//! ```
//!
//! Transfer, bandwidth and interval end all come from that same line. When
//! several such lines are present the last one wins.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error, info};

use super::{validate_target, RawMetricSet, BANDWIDTH_VALUE, INTERVAL_VALUE, TRANSFER_VALUE};
use crate::error::{HealthError, Result};
use crate::platform::Platform;
use crate::runner::{CommandRunner, Invocation};

const SUMMARY_PATTERN: &str = r"(?im)^\s*\[\s*(?:\d+|SUM)\s*\]\s+0+(?:\.0+)?\s*-\s*(?P<interval>\d+(?:\.\d+)?)\s+sec\s+(?P<transfer>\d+(?:\.\d+)?)\s+MBytes\s+(?P<bandwidth>\d+(?:\.\d+)?)\s+MBytes/sec";

/// Binary and flags for the iperf client on one platform.
#[derive(Debug, Clone, Copy)]
pub struct BandwidthDialect {
    pub executable: &'static str,
    /// TCP window size, passed as `-w`.
    pub window_size: Option<&'static str>,
    /// Report format, passed as `-f`. `M` forces MBytes.
    pub format: &'static str,
}

impl BandwidthDialect {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => BandwidthDialect {
                executable: "iperf2",
                window_size: Some("128K"),
                format: "M",
            },
            Platform::Posix => BandwidthDialect {
                executable: "iperf",
                window_size: None,
                format: "M",
            },
        }
    }

    pub fn invocation(&self, target: &str, port: Option<u16>) -> Invocation {
        let mut inv = Invocation::new(self.executable).arg("-c").arg(target);
        if let Some(window) = self.window_size {
            inv = inv.arg("-w").arg(window);
        }
        inv.arg("-f").arg(self.format).port(port)
    }
}

fn summary_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SUMMARY_PATTERN).expect("iperf summary pattern is valid"))
}

/// Run an iperf client against `target` and parse the transfer summary.
pub async fn run_bandwidth(
    runner: &dyn CommandRunner,
    target: &str,
    port: Option<u16>,
    platform: Platform,
) -> Result<RawMetricSet> {
    validate_target(target)?;

    let dialect = BandwidthDialect::for_platform(platform);
    if let Some(port) = port {
        info!(port, "port specified, appending -p");
    }
    info!(%platform, host = target, executable = dialect.executable, "running iperf");

    let output = runner.run(&dialect.invocation(target, port)).await?;
    info!("iperf completed, parsing output");

    let results = parse_bandwidth_output(&output.combined())?;
    for (metric, value) in results.iter() {
        let unit = if metric == INTERVAL_VALUE { "second(s)" } else { "megabyte(s)" };
        info!(host = target, metric, value, unit, "iperf result");
    }
    Ok(results)
}

/// Extract transfer size, bandwidth and interval from iperf client output.
pub fn parse_bandwidth_output(text: &str) -> Result<RawMetricSet> {
    let Some(caps) = summary_pattern().captures_iter(text).last() else {
        let hint = diagnose(text);
        error!(hint, "no interval summary found in iperf output");
        debug!(output = text, "unparsed iperf output");
        return Err(HealthError::ParseFailure {
            tool: "iperf",
            hint: hint.to_string(),
            raw: text.to_string(),
        });
    };

    let mut results = RawMetricSet::new();
    results.insert(TRANSFER_VALUE, &caps["transfer"]);
    results.insert(BANDWIDTH_VALUE, &caps["bandwidth"]);
    results.insert(INTERVAL_VALUE, &caps["interval"]);
    Ok(results)
}

fn diagnose(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if text.trim().is_empty() {
        "iperf produced no output"
    } else if lower.contains("connect failed") || lower.contains("connection refused") {
        "could not connect to the iperf server"
    } else if lower.contains(" sec ")
        && ["gbytes", "kbytes", "mbits/sec", "gbits/sec", "kbits/sec"]
            .iter()
            .any(|unit| lower.contains(unit))
    {
        "summary reported in units other than MBytes (is `-f M` supported?)"
    } else {
        "no zero-anchored interval summary line found"
    }
}
