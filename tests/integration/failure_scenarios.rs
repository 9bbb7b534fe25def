//! Failure tests for the monitoring pipeline
//!
//! These tests verify that faults stay contained:
//! - Credential failures skip the account, not the run
//! - Collection failures degrade to error records
//! - Channel failures never block the other channels
//! - A failed aggregate write never fails the run

use disk_monitoring::runner::{MonitorRunner, run_handler};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn credential_failure_does_not_stop_subsequent_accounts() {
    let mock_server = MockServer::start().await;

    // Every exchange is denied; only the central account can collect
    Mock::given(method("POST"))
        .and(path("/assume-role"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/metrics/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_response_json(&[
            datapoint_json("i-central", 50.0),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.central_account_id = Some("111111111111".to_string());
    // The failing account comes first; the central account must still run
    config.monitored_accounts = vec!["999999999999".to_string(), "111111111111".to_string()];

    let runner = MonitorRunner::new(config);
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.accounts_monitored, 1);
    assert_eq!(summary.total_instances, 1);
    assert_eq!(summary.total_alerts, 0);
    assert_eq!(summary.status, "success");
}

#[tokio::test]
async fn collection_failure_yields_error_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/metrics/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.central_account_id = Some("111111111111".to_string());
    config.monitored_accounts = vec!["111111111111".to_string()];

    let runner = MonitorRunner::new(config);
    let summary = runner.run().await.unwrap();

    // The account is still counted as monitored, with nothing collected
    assert_eq!(summary.accounts_monitored, 1);
    assert_eq!(summary.total_instances, 0);
    assert_eq!(summary.total_alerts, 0);
    assert_eq!(summary.status, "success");
}

#[tokio::test]
async fn channel_failure_does_not_block_other_channels() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/metrics/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_response_json(&[
            datapoint_json("i-full", 96.0),
        ])))
        .mount(&mock_server)
        .await;

    // Slack is down, paging is up; paging must still receive the alert
    Mock::given(method("POST"))
        .and(path("/slack-hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/enqueue"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.central_account_id = Some("111111111111".to_string());
    config.monitored_accounts = vec!["111111111111".to_string()];
    config.slack_webhook_url = Some(format!("{}/slack-hook", mock_server.uri()));
    config.pagerduty_api_key = Some("test-routing-key".to_string());

    let runner = MonitorRunner::new(config);
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.total_alerts, 1);
    assert_eq!(summary.status, "success");
}

#[tokio::test]
async fn aggregate_write_failure_does_not_fail_the_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/metrics/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_response_json(&[
            datapoint_json("i-ok", 50.0),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.central_account_id = Some("111111111111".to_string());
    config.monitored_accounts = vec!["111111111111".to_string()];

    let runner = MonitorRunner::new(config);
    let response = run_handler(&runner).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body["status"], "success");
}
