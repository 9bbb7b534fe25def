pub mod analyzer;
pub mod collector;
pub mod config;
pub mod credentials;
pub mod notify;
pub mod runner;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single name/value pair attached to a datapoint, e.g. `InstanceId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// One aggregated telemetry sample for a single time bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDatapoint {
    pub timestamp: DateTime<Utc>,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl MetricDatapoint {
    /// Value of the `InstanceId` dimension, if the datapoint carries one.
    pub fn instance_id(&self) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.name == "InstanceId")
            .map(|dimension| dimension.value.as_str())
    }
}

/// Collection result for one account.
///
/// A failed collection still yields a record: `error` carries the cause and
/// `datapoints`/`instance_count` are empty, so one bad account never stops
/// the rest of the run.
#[derive(Debug, Clone, Serialize)]
pub struct AccountUsage {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub datapoints: Vec<MetricDatapoint>,
    pub instance_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
    Emergency,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Emergency => "EMERGENCY",
        }
    }

    /// CRITICAL and EMERGENCY page, WARNING does not.
    pub fn priority(&self) -> Priority {
        match self {
            Severity::Warning => Priority::Medium,
            Severity::Critical | Severity::Emergency => Priority::High,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

/// One classified threshold crossing. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub account_id: String,
    pub instance_id: String,
    pub severity: Severity,
    pub priority: Priority,
    pub disk_usage: f64,
    pub threshold: u32,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counts for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub accounts_monitored: usize,
    pub total_instances: usize,
    pub total_alerts: usize,
    pub timestamp: String,
    pub status: String,
}

/// Response envelope returned to the invoking scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}
