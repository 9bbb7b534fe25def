//! Cross-account credential exchange.
//!
//! Every non-central account is reached through a time-boxed delegated role.
//! A failed exchange is an error the caller handles by skipping the account;
//! it never aborts the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::Config;

/// Fixed external id attached to every exchange request for traceability.
const EXTERNAL_ID: &str = "disk-monitoring-solution";

#[derive(Debug, Clone, Serialize)]
struct AssumeRoleRequest {
    role_arn: String,
    role_session_name: String,
    external_id: String,
}

/// Temporary delegated credentials scoped to one downstream account.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

/// Identity used for a single account's collection.
#[derive(Debug, Clone)]
pub enum AccountSession {
    /// The invoking identity; used for the central account.
    Current,
    /// Delegated credentials obtained through the exchange API.
    Delegated(SessionCredentials),
}

#[derive(Debug, Clone)]
pub struct CredentialBroker {
    client: Client,
    endpoint: String,
    central_account_id: Option<String>,
    role_name: String,
}

impl CredentialBroker {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoints.sts.clone(),
            central_account_id: config.central_account_id.clone(),
            role_name: config.cross_account_role_name.clone(),
        }
    }

    /// Obtain a session for `account_id`.
    ///
    /// The central account keeps the invoking identity; any other account
    /// goes through the exchange API with a role ARN built from the account
    /// id and the configured role name.
    #[instrument(skip(self))]
    pub async fn session_for(&self, account_id: &str) -> Result<AccountSession> {
        if Some(account_id) == self.central_account_id.as_deref() {
            debug!("central account, using current identity");
            return Ok(AccountSession::Current);
        }

        let request = AssumeRoleRequest {
            role_arn: format!("arn:aws:iam::{account_id}:role/{}", self.role_name),
            role_session_name: format!("DiskMonitoring-{}", Utc::now().timestamp()),
            external_id: EXTERNAL_ID.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/assume-role", self.endpoint))
            .json(&request)
            .send()
            .await
            .context("failed to send assume-role request")?;

        if !response.status().is_success() {
            anyhow::bail!("assume-role failed: HTTP {}", response.status());
        }

        let credentials: SessionCredentials = response
            .json()
            .await
            .context("failed to parse assume-role response")?;

        debug!("obtained delegated credentials for account {account_id}");
        Ok(AccountSession::Delegated(credentials))
    }
}
