//! Per-account disk-usage collection.
//!
//! Queries the telemetry API for the trailing hour of `disk_used_percent`
//! samples. Collection failures degrade to an error record instead of
//! propagating, so the account loop keeps going.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::credentials::AccountSession;
use crate::{AccountUsage, Dimension, MetricDatapoint};

const METRIC_NAME: &str = "disk_used_percent";
const QUERY_WINDOW_MINUTES: i64 = 60;
const QUERY_PERIOD_SECONDS: u32 = 300;

#[derive(Debug, Clone, Serialize)]
struct MetricQuery {
    namespace: String,
    metric_name: String,
    dimensions: Vec<Dimension>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    period: u32,
    statistics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MetricQueryResponse {
    #[serde(default)]
    datapoints: Vec<MetricDatapoint>,
}

#[derive(Debug, Clone)]
pub struct MetricCollector {
    client: Client,
    endpoint: String,
    namespace: String,
}

impl MetricCollector {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoints.telemetry.clone(),
            namespace: config.namespace.clone(),
        }
    }

    /// Collect the trailing hour of disk metrics for one account.
    ///
    /// Never fails: any API error is folded into the returned record.
    #[instrument(skip(self, session))]
    pub async fn collect(&self, account_id: &str, session: &AccountSession) -> AccountUsage {
        match self.query_datapoints(session).await {
            Ok(datapoints) => {
                let instance_count = distinct_instances(&datapoints);
                debug!(
                    "collected {} datapoints ({instance_count} instances) from account {account_id}",
                    datapoints.len()
                );
                AccountUsage {
                    account_id: account_id.to_string(),
                    timestamp: Utc::now(),
                    datapoints,
                    instance_count,
                    error: None,
                }
            }
            Err(e) => {
                warn!("failed to collect metrics from account {account_id}: {e:#}");
                AccountUsage {
                    account_id: account_id.to_string(),
                    timestamp: Utc::now(),
                    datapoints: Vec::new(),
                    instance_count: 0,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }

    async fn query_datapoints(&self, session: &AccountSession) -> Result<Vec<MetricDatapoint>> {
        let end_time = Utc::now();
        let start_time = end_time - Duration::minutes(QUERY_WINDOW_MINUTES);

        let query = MetricQuery {
            namespace: self.namespace.clone(),
            metric_name: METRIC_NAME.to_string(),
            dimensions: vec![
                Dimension {
                    name: "InstanceId".to_string(),
                    value: "*".to_string(),
                },
                Dimension {
                    name: "Filesystem".to_string(),
                    value: "/".to_string(),
                },
            ],
            start_time,
            end_time,
            period: QUERY_PERIOD_SECONDS,
            statistics: vec![
                "Average".to_string(),
                "Maximum".to_string(),
                "Minimum".to_string(),
            ],
        };

        let mut request = self
            .client
            .post(format!("{}/metrics/query", self.endpoint))
            .json(&query);

        if let AccountSession::Delegated(credentials) = session {
            request = request
                .header("X-Access-Key-Id", &credentials.access_key_id)
                .header("X-Session-Token", &credentials.session_token);
        }

        let response = request.send().await.context("failed to send metric query")?;

        if !response.status().is_success() {
            anyhow::bail!("metric query failed: HTTP {}", response.status());
        }

        let body: MetricQueryResponse = response
            .json()
            .await
            .context("failed to parse metric query response")?;

        Ok(body.datapoints)
    }
}

/// Number of distinct `InstanceId` values across a set of datapoints.
fn distinct_instances(datapoints: &[MetricDatapoint]) -> usize {
    datapoints
        .iter()
        .filter_map(MetricDatapoint::instance_id)
        .collect::<HashSet<_>>()
        .len()
}
