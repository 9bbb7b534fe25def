use tracing::trace;

use crate::Severity;

const MONITORING_NAMESPACE: &str = "MONITORING_NAMESPACE";
const LOG_RETENTION_DAYS: &str = "LOG_RETENTION_DAYS";

const ALERT_THRESHOLD_WARNING: &str = "ALERT_THRESHOLD_WARNING";
const ALERT_THRESHOLD_CRITICAL: &str = "ALERT_THRESHOLD_CRITICAL";
const ALERT_THRESHOLD_EMERGENCY: &str = "ALERT_THRESHOLD_EMERGENCY";

const SNS_TOPIC_ARN: &str = "SNS_TOPIC_ARN";
const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
const PAGERDUTY_API_KEY: &str = "PAGERDUTY_API_KEY";

const CENTRAL_ACCOUNT_ID: &str = "CENTRAL_ACCOUNT_ID";
const CROSS_ACCOUNT_ROLE_NAME: &str = "CROSS_ACCOUNT_ROLE_NAME";
const MONITORED_ACCOUNTS: &str = "MONITORED_ACCOUNTS";

const TELEMETRY_ENDPOINT: &str = "TELEMETRY_ENDPOINT";
const STS_ENDPOINT: &str = "STS_ENDPOINT";
const PUBSUB_ENDPOINT: &str = "PUBSUB_ENDPOINT";
const PAGERDUTY_ENDPOINT: &str = "PAGERDUTY_ENDPOINT";

const DEFAULT_NAMESPACE: &str = "DiskMonitoring";
const DEFAULT_ROLE_NAME: &str = "DiskMonitoringRole";
const DEFAULT_PAGERDUTY_ENDPOINT: &str = "https://events.pagerduty.com/v2/enqueue";

/// Severity thresholds in percent.
///
/// Nothing enforces `warning < critical < emergency`; an inverted ordering
/// silently shadows the lower levels.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub warning: u32,
    pub critical: u32,
    pub emergency: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            warning: 80,
            critical: 90,
            emergency: 95,
        }
    }
}

impl Thresholds {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Warning => self.warning,
            Severity::Critical => self.critical,
            Severity::Emergency => self.emergency,
        }
    }
}

/// Base URLs of the external APIs.
///
/// Overridable through the environment so tests can point every call at a
/// mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub telemetry: String,
    pub sts: String,
    pub pubsub: String,
    pub pagerduty: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            telemetry: String::from("https://monitoring.us-east-1.amazonaws.com"),
            sts: String::from("https://sts.amazonaws.com"),
            pubsub: String::from("https://sns.us-east-1.amazonaws.com"),
            pagerduty: String::from(DEFAULT_PAGERDUTY_ENDPOINT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    /// Declared for parity with the deployed log-group settings; not used by
    /// the collection logic itself.
    pub log_retention_days: u32,
    pub thresholds: Thresholds,
    pub sns_topic_arn: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub pagerduty_api_key: Option<String>,
    pub central_account_id: Option<String>,
    pub cross_account_role_name: String,
    pub monitored_accounts: Vec<String>,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: String::from(DEFAULT_NAMESPACE),
            log_retention_days: 30,
            thresholds: Thresholds::default(),
            sns_topic_arn: None,
            slack_webhook_url: None,
            pagerduty_api_key: None,
            central_account_id: None,
            cross_account_role_name: String::from(DEFAULT_ROLE_NAME),
            monitored_accounts: Vec::new(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Config {
        let defaults = Endpoints::default();

        let config = Config {
            namespace: get_string(MONITORING_NAMESPACE, DEFAULT_NAMESPACE),
            log_retention_days: get_u32(LOG_RETENTION_DAYS, 30),
            thresholds: Thresholds {
                warning: get_u32(ALERT_THRESHOLD_WARNING, 80),
                critical: get_u32(ALERT_THRESHOLD_CRITICAL, 90),
                emergency: get_u32(ALERT_THRESHOLD_EMERGENCY, 95),
            },
            sns_topic_arn: get_optional(SNS_TOPIC_ARN),
            slack_webhook_url: get_optional(SLACK_WEBHOOK_URL),
            pagerduty_api_key: get_optional(PAGERDUTY_API_KEY),
            central_account_id: get_optional(CENTRAL_ACCOUNT_ID),
            cross_account_role_name: get_string(CROSS_ACCOUNT_ROLE_NAME, DEFAULT_ROLE_NAME),
            monitored_accounts: parse_account_list(
                &get_string(MONITORED_ACCOUNTS, ""),
            ),
            endpoints: Endpoints {
                telemetry: get_string(TELEMETRY_ENDPOINT, &defaults.telemetry),
                sts: get_string(STS_ENDPOINT, &defaults.sts),
                pubsub: get_string(PUBSUB_ENDPOINT, &defaults.pubsub),
                pagerduty: get_string(PAGERDUTY_ENDPOINT, &defaults.pagerduty),
            },
        };

        trace!("loaded config: {config:?}");
        config
    }
}

/// Split a comma-separated account list, dropping surrounding whitespace and
/// empty entries.
pub fn parse_account_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|account| !account.is_empty())
        .map(String::from)
        .collect()
}

fn get_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).map_or(default, |value| value.parse().unwrap_or(default))
}

fn get_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
