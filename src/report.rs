//! Human-readable rendering of check outcomes.

use crate::probes::{
    ProbeKind, RawMetricSet, AVERAGE_LATENCY, BANDWIDTH_VALUE, INTERVAL_VALUE, MAX_LATENCY,
    MINIMUM_LATENCY, PACKET_LOSS, STANDARD_DEVIATION_LATENCY, TRANSFER_VALUE,
};
use crate::{RunReport, TestOutcome};

/// Format one outcome as a single summary line.
pub fn format_summary(outcome: &TestOutcome) -> String {
    let head = format!("{} {}", outcome.test_type, outcome.target);

    if let Some(err) = &outcome.probe_error {
        return format!("{}: FAILED ({})", head, first_line(err));
    }

    let body = match &outcome.metrics {
        Some(m) => match outcome.test_type.kind() {
            ProbeKind::Ping => format_ping(m),
            ProbeKind::Bandwidth => format_bandwidth(m),
        },
        None => "no metrics".to_string(),
    };

    let mut summary = format!("{}: {}", head, body);
    if outcome.submitted {
        summary.push_str(" [submitted]");
    }
    if let Some(err) = &outcome.submit_error {
        summary.push_str(&format!(" [submit failed: {}]", first_line(err)));
    }
    summary
}

/// Format a whole run as a small table.
pub fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n=== Network Health ({}) ===\n", report.platform));
    for outcome in &report.outcomes {
        let status = if outcome.succeeded() { "PASS" } else { "FAIL" };
        out.push_str(&format!("{:<5}| {}\n", status, format_summary(outcome)));
    }
    out.push_str(&format!(
        "{} check{}, {} failed\n",
        report.outcomes.len(),
        if report.outcomes.len() == 1 { "" } else { "s" },
        report.failures()
    ));
    out
}

fn format_ping(m: &RawMetricSet) -> String {
    let mut s = format!(
        "loss {}%, min/avg/max {}/{}/{} ms",
        value(m, PACKET_LOSS),
        value(m, MINIMUM_LATENCY),
        value(m, AVERAGE_LATENCY),
        value(m, MAX_LATENCY),
    );
    if let Some(dev) = m.get(STANDARD_DEVIATION_LATENCY) {
        s.push_str(&format!(", stddev {} ms", dev));
    }
    s
}

fn format_bandwidth(m: &RawMetricSet) -> String {
    format!(
        "{} MBytes in {} sec ({} MBytes/sec)",
        value(m, TRANSFER_VALUE),
        value(m, INTERVAL_VALUE),
        value(m, BANDWIDTH_VALUE),
    )
}

fn value<'a>(m: &'a RawMetricSet, key: &str) -> &'a str {
    m.get(key).unwrap_or("?")
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or(s)
}
