//! Metric descriptors and the normalizer that turns a raw metric set into a
//! backend series.

pub mod normalize;

pub use normalize::{normalize, normalize_at, DataPoint, SubmissionBatch};

use serde::{Serialize, Serializer};

use crate::error::{HealthError, Result};
use crate::probes::{
    AVERAGE_LATENCY, BANDWIDTH_VALUE, INTERVAL_VALUE, MAX_LATENCY, MINIMUM_LATENCY, PACKET_LOSS,
    STANDARD_DEVIATION_LATENCY, TRANSFER_VALUE,
};

/// Prefix of every submitted metric name.
pub const METRIC_NAMESPACE: &str = "network_health";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Megabyte,
    Percent,
    Millisecond,
    Second,
}

/// Backend metric intake type. Serialized as the backend's integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Count,
    Rate,
}

impl MetricType {
    pub fn code(&self) -> u8 {
        match self {
            MetricType::Count => 1,
            MetricType::Rate => 2,
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub unit: MetricUnit,
    pub metric_type: MetricType,
}

const fn descriptor(unit: MetricUnit, metric_type: MetricType) -> MetricDescriptor {
    MetricDescriptor { unit, metric_type }
}

// interval_value is tagged megabyte, matching what the backend dashboards
// already consume.
static DESCRIPTORS: &[(&str, MetricDescriptor)] = &[
    (TRANSFER_VALUE, descriptor(MetricUnit::Megabyte, MetricType::Rate)),
    (BANDWIDTH_VALUE, descriptor(MetricUnit::Megabyte, MetricType::Rate)),
    (INTERVAL_VALUE, descriptor(MetricUnit::Megabyte, MetricType::Rate)),
    (PACKET_LOSS, descriptor(MetricUnit::Percent, MetricType::Count)),
    (MINIMUM_LATENCY, descriptor(MetricUnit::Millisecond, MetricType::Rate)),
    (AVERAGE_LATENCY, descriptor(MetricUnit::Millisecond, MetricType::Rate)),
    (MAX_LATENCY, descriptor(MetricUnit::Millisecond, MetricType::Rate)),
    (
        STANDARD_DEVIATION_LATENCY,
        descriptor(MetricUnit::Millisecond, MetricType::Rate),
    ),
];

/// Look up the fixed unit and type for a metric key.
pub fn descriptor_for(name: &str) -> Result<MetricDescriptor> {
    DESCRIPTORS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, d)| *d)
        .ok_or_else(|| HealthError::UnknownMetric(name.to_string()))
}
