//! Threshold classification of collected datapoints.
//!
//! Pure functions over one account's datapoint list; all I/O stays in the
//! collector and notifier.

use crate::config::Thresholds;
use crate::{AccountUsage, Alert, Severity};

/// Classify a usage reading against the configured thresholds.
///
/// Checked in descending order; a value equal to a threshold triggers that
/// level. Values below the warning threshold produce nothing.
pub fn classify(value: f64, thresholds: &Thresholds) -> Option<Severity> {
    if value >= f64::from(thresholds.emergency) {
        Some(Severity::Emergency)
    } else if value >= f64::from(thresholds.critical) {
        Some(Severity::Critical)
    } else if value >= f64::from(thresholds.warning) {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Walk one account's datapoints and build alerts for every threshold
/// crossing. Datapoints below all thresholds are skipped silently.
pub fn analyze(usage: &AccountUsage, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for datapoint in &usage.datapoints {
        let Some(severity) = classify(datapoint.average, thresholds) else {
            continue;
        };

        alerts.push(Alert {
            account_id: usage.account_id.clone(),
            instance_id: datapoint.instance_id().unwrap_or("Unknown").to_string(),
            severity,
            priority: severity.priority(),
            disk_usage: datapoint.average,
            threshold: thresholds.for_severity(severity),
            timestamp: datapoint.timestamp,
        });
    }

    alerts
}
