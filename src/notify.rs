//! Alert fan-out to the configured notification channels.
//!
//! Every channel is independent and best-effort: a failed send is logged and
//! recorded in the dispatch report, and the remaining channels are still
//! attempted. Only channels with a configured destination are built at all.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::{Alert, Priority, Severity};

/// Human-readable message shared by all channels.
pub fn format_alert_message(alert: &Alert) -> String {
    format!(
        "Disk Usage Alert - {}\n\n\
         Account: {}\n\
         Instance: {}\n\
         Usage: {:.1}%\n\
         Threshold: {}%\n\
         Time: {}\n\n\
         This alert was generated by the fleet disk monitoring collector.",
        alert.severity,
        alert.account_id,
        alert.instance_id,
        alert.disk_usage,
        alert.threshold,
        alert.timestamp.to_rfc3339(),
    )
}

/// Slack icon for a severity.
///
/// CRITICAL shares the warning icon; only EMERGENCY gets the rotating light.
pub fn slack_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning | Severity::Critical => ":warning:",
        Severity::Emergency => ":rotating_light:",
    }
}

/// Map a severity onto the paging API's critical/warning scale.
///
/// Only EMERGENCY pages as critical; CRITICAL pages as warning.
pub fn paging_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Emergency => "critical",
        Severity::Warning | Severity::Critical => "warning",
    }
}

/// Outcome of one channel's delivery attempt, as a value.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: &'static str,
    pub success: bool,
    pub error: Option<String>,
}

impl Delivery {
    fn success(channel: &'static str) -> Self {
        Delivery {
            channel,
            success: true,
            error: None,
        }
    }

    fn failure(channel: &'static str, error: impl ToString) -> Self {
        Delivery {
            channel,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Per-alert dispatch outcome across all attempted channels.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.deliveries.len()
    }

    pub fn failed(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| !delivery.success)
            .count()
    }
}

/// One notification delivery target.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this channel wants the alert at all.
    fn wants(&self, _alert: &Alert) -> bool {
        true
    }

    async fn send(&self, alert: &Alert, message: &str) -> Result<()>;
}

/// Pub/sub topic channel.
pub struct TopicPublisher {
    client: Client,
    endpoint: String,
    topic_arn: String,
}

impl TopicPublisher {
    pub fn new(endpoint: String, topic_arn: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            topic_arn,
        }
    }
}

#[async_trait]
impl Notifier for TopicPublisher {
    fn name(&self) -> &'static str {
        "topic"
    }

    async fn send(&self, alert: &Alert, message: &str) -> Result<()> {
        let payload = json!({
            "topic_arn": self.topic_arn,
            "subject": format!("Disk Usage {} - {}", alert.severity, alert.instance_id),
            "message": message,
        });

        let response = self
            .client
            .post(format!("{}/publish", self.endpoint))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("topic publish failed: HTTP {}", response.status());
        }

        Ok(())
    }
}

/// Chat webhook channel.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, alert: &Alert, message: &str) -> Result<()> {
        let payload = json!({
            "text": message,
            "username": "Disk Monitoring Bot",
            "icon_emoji": slack_icon(alert.severity),
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook failed: HTTP {}", response.status());
        }

        Ok(())
    }
}

/// Incident-paging channel. Only high-priority alerts page.
pub struct PagerDutyNotifier {
    client: Client,
    endpoint: String,
    routing_key: String,
}

impl PagerDutyNotifier {
    pub fn new(endpoint: String, routing_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            routing_key,
        }
    }
}

#[async_trait]
impl Notifier for PagerDutyNotifier {
    fn name(&self) -> &'static str {
        "pagerduty"
    }

    fn wants(&self, alert: &Alert) -> bool {
        alert.priority == Priority::High
    }

    async fn send(&self, alert: &Alert, message: &str) -> Result<()> {
        let payload = json!({
            "routing_key": self.routing_key,
            "event_action": "trigger",
            "payload": {
                "summary": format!("Disk Usage {} - {}", alert.severity, alert.instance_id),
                "severity": paging_severity(alert.severity),
                "source": format!("aws-{}", alert.account_id),
                "custom_details": message,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("paging event failed: HTTP {}", response.status());
        }

        Ok(())
    }
}

/// Fans one alert out to every configured channel.
pub struct AlertDispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl AlertDispatcher {
    /// Build the channel list from configuration. Unconfigured channels are
    /// simply absent.
    pub fn from_config(config: &Config) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if let Some(topic_arn) = &config.sns_topic_arn {
            channels.push(Box::new(TopicPublisher::new(
                config.endpoints.pubsub.clone(),
                topic_arn.clone(),
            )));
        }

        if let Some(webhook_url) = &config.slack_webhook_url {
            channels.push(Box::new(SlackNotifier::new(webhook_url.clone())));
        }

        if let Some(routing_key) = &config.pagerduty_api_key {
            channels.push(Box::new(PagerDutyNotifier::new(
                config.endpoints.pagerduty.clone(),
                routing_key.clone(),
            )));
        }

        Self { channels }
    }

    pub fn with_channels(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Send one alert through every channel that wants it.
    ///
    /// Channel failures are isolated: each is logged, recorded in the report
    /// and the remaining channels are still attempted.
    #[instrument(skip(self, alert), fields(account = %alert.account_id, instance = %alert.instance_id))]
    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let message = format_alert_message(alert);
        let mut report = DispatchReport::default();

        for channel in &self.channels {
            if !channel.wants(alert) {
                continue;
            }

            match channel.send(alert, &message).await {
                Ok(()) => {
                    info!(
                        "sent {} alert for {} via {}",
                        alert.severity,
                        alert.instance_id,
                        channel.name()
                    );
                    report.deliveries.push(Delivery::success(channel.name()));
                }
                Err(e) => {
                    error!("failed to send alert via {}: {e:#}", channel.name());
                    report
                        .deliveries
                        .push(Delivery::failure(channel.name(), format!("{e:#}")));
                }
            }
        }

        report
    }
}
