//! Latency and packet-loss probe driven by the system `ping` binary.
//!
//! The whole captured output is matched against one platform pattern. The
//! pattern is case-insensitive and `.` crosses line breaks, so the loss figure
//! and the round-trip summary may sit on different lines.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error, info};

use super::{
    validate_target, RawMetricSet, AVERAGE_LATENCY, MAX_LATENCY, MINIMUM_LATENCY, PACKET_LOSS,
    STANDARD_DEVIATION_LATENCY,
};
use crate::error::{HealthError, Result};
use crate::platform::Platform;
use crate::runner::{CommandRunner, Invocation};

pub const DEFAULT_PACKET_COUNT: u32 = 100;

// linux:  "4 packets transmitted, 4 received, 0% packet loss, time 3004ms"
//         "rtt min/avg/max/mdev = 0.041/0.052/0.067/0.010 ms"
// macOS:  "round-trip min/avg/max/stddev = 0.049/0.070/0.095/0.018 ms"
const POSIX_PATTERN: &str = r"(?is)(?P<loss>\d+(?:\.\d+)?)%\s+packet\s+loss.*?min/avg/max/(?:m|std)?dev\s*=\s*(?P<min>\d+(?:\.\d+)?)/(?P<avg>\d+(?:\.\d+)?)/(?P<max>\d+(?:\.\d+)?)/(?P<dev>\d+(?:\.\d+)?)\s*ms";

// "Packets: Sent = 4, Received = 4, Lost = 0 (0% loss),"
// "Minimum = 9ms, Maximum = 11ms, Average = 10ms"
const WINDOWS_PATTERN: &str = r"(?is)\((?P<loss>\d+(?:\.\d+)?)%\s*loss\).*?Minimum\s*=\s*(?P<min>\d+(?:\.\d+)?)\s*ms.*?Maximum\s*=\s*(?P<max>\d+(?:\.\d+)?)\s*ms.*?Average\s*=\s*(?P<avg>\d+(?:\.\d+)?)\s*ms";

/// How `ping` is invoked and read on one platform.
#[derive(Debug)]
pub struct PingDialect {
    pub executable: &'static str,
    pub count_flag: &'static str,
    pub pattern: &'static Regex,
    /// Windows ping reports no standard deviation.
    pub reports_deviation: bool,
}

impl PingDialect {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => PingDialect {
                executable: "ping",
                count_flag: "-n",
                pattern: windows_pattern(),
                reports_deviation: false,
            },
            Platform::Posix => PingDialect {
                executable: "ping",
                count_flag: "-c",
                pattern: posix_pattern(),
                reports_deviation: true,
            },
        }
    }

    pub fn invocation(&self, target: &str, packet_count: u32) -> Invocation {
        Invocation::new(self.executable)
            .arg(target)
            .arg(self.count_flag)
            .arg(packet_count.to_string())
    }
}

fn posix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(POSIX_PATTERN).expect("posix ping pattern is valid"))
}

fn windows_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WINDOWS_PATTERN).expect("windows ping pattern is valid"))
}

/// Ping `target` `packet_count` times and parse the summary statistics.
pub async fn run_ping(
    runner: &dyn CommandRunner,
    target: &str,
    packet_count: u32,
    platform: Platform,
) -> Result<RawMetricSet> {
    validate_target(target)?;
    if packet_count == 0 {
        return Err(HealthError::InvalidArgument(
            "packet count must be positive".to_string(),
        ));
    }

    let dialect = PingDialect::for_platform(platform);
    info!(%platform, host = target, packet_count, "running ping");

    let output = runner.run(&dialect.invocation(target, packet_count)).await?;
    info!("ping completed, parsing output");

    let results = parse_ping_output(&output.combined(), platform)?;
    for (metric, value) in results.iter() {
        let unit = if metric == PACKET_LOSS { "%" } else { "ms" };
        info!(host = target, metric, value, unit, "ping result");
    }
    Ok(results)
}

/// Extract loss and latency statistics from captured ping output.
///
/// Values are returned exactly as printed. On Windows the set has no
/// `standard_deviation_latency` entry.
pub fn parse_ping_output(text: &str, platform: Platform) -> Result<RawMetricSet> {
    let dialect = PingDialect::for_platform(platform);

    let Some(caps) = dialect.pattern.captures(text) else {
        error!(%platform, "no statistics found in ping output");
        debug!(output = text, "unparsed ping output");
        return Err(HealthError::ParseFailure {
            tool: "ping",
            hint: diagnose(text).to_string(),
            raw: text.to_string(),
        });
    };

    let mut results = RawMetricSet::new();
    results.insert(PACKET_LOSS, &caps["loss"]);
    results.insert(MINIMUM_LATENCY, &caps["min"]);
    results.insert(AVERAGE_LATENCY, &caps["avg"]);
    results.insert(MAX_LATENCY, &caps["max"]);
    if dialect.reports_deviation {
        results.insert(STANDARD_DEVIATION_LATENCY, &caps["dev"]);
    }
    Ok(results)
}

fn diagnose(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if text.trim().is_empty() {
        "ping produced no output"
    } else if lower.contains("unknown host")
        || lower.contains("could not find host")
        || lower.contains("name or service not known")
    {
        "target could not be resolved"
    } else if lower.contains("100% packet loss") || lower.contains("(100% loss)") {
        "no replies were received"
    } else {
        "round-trip statistics block not found"
    }
}
