// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot webhook delivery of batch ledgers.
//!
//! Delivery is best effort: one POST with a bounded timeout, no retry. The
//! outcome is logged and counted but never changes the ledger.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use wasend_config::model::WebhookConfig;
use wasend_core::{BatchLedger, SendResult, WasendError};

/// JSON body posted to the webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    pub secret: &'a str,
    pub batch_id: Uuid,
    pub results: &'a [SendResult],
}

pub struct WebhookReporter {
    client: reqwest::Client,
    url: Option<String>,
    secret: String,
    timeout: Duration,
}

impl WebhookReporter {
    pub fn new(config: &WebhookConfig) -> Result<Self, WasendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WasendError::Webhook {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            secret: config.secret.clone().unwrap_or_default(),
            timeout: config.timeout(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Post the ledger. Returns whether the destination accepted it.
    pub async fn report(&self, ledger: &BatchLedger) -> bool {
        let Some(url) = &self.url else {
            info!(
                batch_id = %ledger.batch_id,
                ok = ledger.ok_count(),
                failed = ledger.error_count(),
                "no webhook configured, skipping report"
            );
            return false;
        };

        let delivered = match self.post(url, ledger).await {
            Ok(()) => {
                info!(batch_id = %ledger.batch_id, items = ledger.len(), "batch report delivered");
                true
            }
            Err(e) => {
                error!(batch_id = %ledger.batch_id, error = %e, "batch report not delivered");
                false
            }
        };
        wasend_prometheus::record_webhook(delivered);
        delivered
    }

    async fn post(&self, url: &str, ledger: &BatchLedger) -> Result<(), WasendError> {
        let payload = WebhookPayload {
            secret: &self.secret,
            batch_id: ledger.batch_id,
            results: &ledger.results,
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    format!("request failed: {e}")
                };
                WasendError::Webhook {
                    message,
                    source: Some(Box::new(e)),
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "webhook rejected batch report");
        Err(WasendError::Webhook {
            message: format!("webhook returned {status}"),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use wasend_core::SendRequest;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(url: Option<String>) -> WebhookConfig {
        WebhookConfig {
            url,
            secret: Some("s3cret".into()),
            timeout_secs: 1,
        }
    }

    fn ledger() -> BatchLedger {
        let req = SendRequest::new("5511", "hi").with_row_index(serde_json::json!(4));
        BatchLedger::new(
            Uuid::new_v4(),
            vec![SendResult::ok(&req, &wasend_core::ChatAddress("5511@c.us".into()))],
        )
    }

    #[tokio::test]
    async fn posts_secret_batch_id_and_results() {
        let server = MockServer::start().await;
        let ledger = ledger();

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "secret": "s3cret",
                "batchId": ledger.batch_id.to_string(),
                "results": [{"recipient": "5511", "rowIndex": 4, "status": "OK"}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = WebhookReporter::new(&config(Some(format!("{}/hook", server.uri())))).unwrap();
        assert!(reporter.report(&ledger).await);
    }

    #[tokio::test]
    async fn non_success_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = WebhookReporter::new(&config(Some(server.uri()))).unwrap();
        assert!(!reporter.report(&ledger()).await);
    }

    #[tokio::test]
    async fn slow_destination_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let reporter = WebhookReporter::new(&config(Some(server.uri()))).unwrap();
        assert!(!reporter.report(&ledger()).await);
    }

    #[tokio::test]
    async fn missing_destination_skips_report() {
        let reporter = WebhookReporter::new(&config(None)).unwrap();
        assert!(!reporter.is_configured());
        assert!(!reporter.report(&ledger()).await);
    }
}
