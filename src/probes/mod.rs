//! Tool-driven probes and the flat metric set they produce.

use serde::Serialize;

use crate::error::HealthError;

pub mod iperf;
pub mod ping;

pub const PACKET_LOSS: &str = "packet_loss";
pub const MINIMUM_LATENCY: &str = "minimum_latency";
pub const AVERAGE_LATENCY: &str = "average_latency";
pub const MAX_LATENCY: &str = "max_latency";
pub const STANDARD_DEVIATION_LATENCY: &str = "standard_deviation_latency";

pub const TRANSFER_VALUE: &str = "transfer_value";
pub const BANDWIDTH_VALUE: &str = "bandwidth_value";
pub const INTERVAL_VALUE: &str = "interval_value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Ping,
    Bandwidth,
}

/// Whether the target sits on the local network or beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestScope {
    Local,
    Remote,
}

/// Classification used in metric names: `network_health.<test_type>.<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    PingLocal,
    PingRemote,
    BandwidthLocal,
    BandwidthRemote,
}

impl TestType {
    pub fn new(kind: ProbeKind, scope: TestScope) -> Self {
        match (kind, scope) {
            (ProbeKind::Ping, TestScope::Local) => TestType::PingLocal,
            (ProbeKind::Ping, TestScope::Remote) => TestType::PingRemote,
            (ProbeKind::Bandwidth, TestScope::Local) => TestType::BandwidthLocal,
            (ProbeKind::Bandwidth, TestScope::Remote) => TestType::BandwidthRemote,
        }
    }

    pub fn kind(&self) -> ProbeKind {
        match self {
            TestType::PingLocal | TestType::PingRemote => ProbeKind::Ping,
            TestType::BandwidthLocal | TestType::BandwidthRemote => ProbeKind::Bandwidth,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::PingLocal => "ping_local",
            TestType::PingRemote => "ping_remote",
            TestType::BandwidthLocal => "bandwidth_local",
            TestType::BandwidthRemote => "bandwidth_remote",
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric name to captured value text, in the order the parser inserted them.
///
/// Values stay as the tool printed them; conversion to numbers happens in
/// [`crate::metrics::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetricSet {
    entries: Vec<(String, String)>,
}

impl RawMetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`. A replaced entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawMetricSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = RawMetricSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Reject targets that are empty, could be read as a flag, or carry characters
/// no hostname or IP literal contains.
pub(crate) fn validate_target(target: &str) -> crate::error::Result<()> {
    if target.is_empty() {
        return Err(HealthError::InvalidArgument("target cannot be empty".to_string()));
    }
    if target.starts_with('-') {
        return Err(HealthError::InvalidArgument(format!(
            "target `{}` cannot start with a hyphen",
            target
        )));
    }
    if target
        .chars()
        .any(|c| !c.is_alphanumeric() && !matches!(c, '.' | '-' | ':' | '_' | '%'))
    {
        return Err(HealthError::InvalidArgument(format!(
            "target `{}` contains invalid characters",
            target
        )));
    }
    Ok(())
}

impl Serialize for RawMetricSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
