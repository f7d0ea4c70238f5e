use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::Number;

use super::{descriptor_for, MetricType, MetricUnit, METRIC_NAMESPACE};
use crate::error::{HealthError, Result};
use crate::probes::{RawMetricSet, TestType};

/// One timestamped value bound for the backend.
///
/// Serializes to the series element shape of the v2 intake API:
/// `{"metric", "type", "unit", "points": [..], "resources": [..]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub metric_name: String,
    pub host: String,
    pub resource_type: &'static str,
    pub metric_type: MetricType,
    pub unit: MetricUnit,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub value: Number,
}

impl Serialize for DataPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Point<'a> {
            timestamp: i64,
            value: &'a Number,
        }

        #[derive(Serialize)]
        struct Resource<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            kind: &'a str,
        }

        #[derive(Serialize)]
        struct Series<'a> {
            metric: &'a str,
            #[serde(rename = "type")]
            metric_type: MetricType,
            unit: MetricUnit,
            points: [Point<'a>; 1],
            resources: [Resource<'a>; 1],
        }

        Series {
            metric: &self.metric_name,
            metric_type: self.metric_type,
            unit: self.unit,
            points: [Point {
                timestamp: self.timestamp,
                value: &self.value,
            }],
            resources: [Resource {
                name: &self.host,
                kind: self.resource_type,
            }],
        }
        .serialize(serializer)
    }
}

/// Data points submitted in one backend call, in metric set order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionBatch {
    pub series: Vec<DataPoint>,
}

impl SubmissionBatch {
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Normalize `metrics` into a batch stamped with the current time.
pub fn normalize(metrics: &RawMetricSet, host: &str, test_type: TestType) -> Result<SubmissionBatch> {
    normalize_at(metrics, host, test_type, Utc::now().timestamp())
}

/// Normalize `metrics` into a batch where every point carries `timestamp`.
pub fn normalize_at(
    metrics: &RawMetricSet,
    host: &str,
    test_type: TestType,
    timestamp: i64,
) -> Result<SubmissionBatch> {
    let series = metrics
        .iter()
        .map(|(key, value)| {
            let descriptor = descriptor_for(key)?;
            Ok(DataPoint {
                metric_name: format!("{}.{}.{}", METRIC_NAMESPACE, test_type, key),
                host: host.to_string(),
                resource_type: "host",
                metric_type: descriptor.metric_type,
                unit: descriptor.unit,
                timestamp,
                value: to_number(key, value)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SubmissionBatch { series })
}

// Integers stay integers so "120" is sent as 120, not 120.0.
fn to_number(metric: &str, value: &str) -> Result<Number> {
    if let Ok(n) = value.parse::<u64>() {
        return Ok(Number::from(n));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| HealthError::InvalidMetricValue {
            metric: metric.to_string(),
            value: value.to_string(),
        })
}
