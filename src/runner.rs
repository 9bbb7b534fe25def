//! The account loop: session, collect, analyze, notify, aggregate.
//!
//! Strictly sequential, one account at a time. A credential failure skips
//! the account; a collection failure yields an error record; neither stops
//! the run. The only hard failure surface is the top-level handler, which
//! converts anything escaping into a 500-style envelope.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::collector::MetricCollector;
use crate::config::Config;
use crate::credentials::CredentialBroker;
use crate::notify::AlertDispatcher;
use crate::{AccountUsage, Alert, RunResponse, RunSummary, analyzer};

/// Writes the per-run aggregate counters back to the telemetry API.
#[derive(Debug, Clone)]
pub struct AggregateReporter {
    client: Client,
    endpoint: String,
    namespace: String,
}

impl AggregateReporter {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoints.telemetry.clone(),
            namespace: config.namespace.clone(),
        }
    }

    /// One batched write of the three run counters, all timestamped now.
    /// A failed write is logged and swallowed; it never fails the run.
    #[instrument(skip(self, aggregated))]
    pub async fn store_aggregates(&self, aggregated: &[AccountUsage], total_alerts: usize) {
        let now = Utc::now();
        let total_instances: usize = aggregated.iter().map(|usage| usage.instance_count).sum();

        let batch = json!({
            "namespace": format!("{}/Aggregated", self.namespace),
            "metric_data": [
                {
                    "metric_name": "TotalInstancesMonitored",
                    "value": total_instances,
                    "unit": "Count",
                    "timestamp": now,
                },
                {
                    "metric_name": "TotalAlertsGenerated",
                    "value": total_alerts,
                    "unit": "Count",
                    "timestamp": now,
                },
                {
                    "metric_name": "AccountsMonitored",
                    "value": aggregated.len(),
                    "unit": "Count",
                    "timestamp": now,
                },
            ],
        });

        let result = self
            .client
            .post(format!("{}/metrics", self.endpoint))
            .json(&batch)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    "stored aggregated metrics: {} accounts, {total_alerts} alerts",
                    aggregated.len()
                );
            }
            Ok(response) => {
                error!(
                    "aggregated metric write failed with status: {}",
                    response.status()
                );
            }
            Err(e) => {
                error!("failed to store aggregated metrics: {e}");
            }
        }
    }
}

pub struct MonitorRunner {
    config: Config,
    broker: CredentialBroker,
    collector: MetricCollector,
    dispatcher: AlertDispatcher,
    reporter: AggregateReporter,
}

impl MonitorRunner {
    pub fn new(config: Config) -> Self {
        let broker = CredentialBroker::new(&config);
        let collector = MetricCollector::new(&config);
        let dispatcher = AlertDispatcher::from_config(&config);
        let reporter = AggregateReporter::new(&config);

        Self {
            config,
            broker,
            collector,
            dispatcher,
            reporter,
        }
    }

    /// Process every configured account and return the run summary.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunSummary> {
        let accounts = &self.config.monitored_accounts;
        info!("monitoring {} accounts", accounts.len());

        let mut aggregated: Vec<AccountUsage> = Vec::new();
        let mut alerts: Vec<Alert> = Vec::new();

        for account_id in accounts {
            let session = match self.broker.session_for(account_id).await {
                Ok(session) => session,
                Err(e) => {
                    error!("failed to obtain session for account {account_id}: {e:#}");
                    continue;
                }
            };

            let usage = self.collector.collect(account_id, &session).await;
            let account_alerts = analyzer::analyze(&usage, &self.config.thresholds);
            aggregated.push(usage);

            for alert in &account_alerts {
                let report = self.dispatcher.dispatch(alert).await;
                debug!(
                    "dispatched alert for {}: {} channels attempted, {} failed",
                    alert.instance_id,
                    report.attempted(),
                    report.failed()
                );
            }

            alerts.extend(account_alerts);
        }

        self.reporter.store_aggregates(&aggregated, alerts.len()).await;

        let summary = RunSummary {
            accounts_monitored: aggregated.len(),
            total_instances: aggregated.iter().map(|usage| usage.instance_count).sum(),
            total_alerts: alerts.len(),
            timestamp: Utc::now().to_rfc3339(),
            status: "success".to_string(),
        };

        info!(
            "run complete: {} accounts, {} instances, {} alerts",
            summary.accounts_monitored, summary.total_instances, summary.total_alerts
        );

        Ok(summary)
    }
}

/// Top-level entry point for the scheduler.
///
/// Anything escaping the run is caught here exactly once and converted into
/// a 500-style envelope; the host scheduler never sees a crash.
pub async fn run_handler(runner: &MonitorRunner) -> RunResponse {
    let result = runner
        .run()
        .await
        .and_then(|summary| serde_json::to_value(&summary).context("failed to serialize summary"));

    match result {
        Ok(body) => RunResponse {
            status_code: 200,
            body,
        },
        Err(e) => {
            error!("monitoring run failed: {e:#}");
            RunResponse {
                status_code: 500,
                body: json!({ "error": format!("{e:#}") }),
            }
        }
    }
}
