//! Notification channels.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::report::MonitoringReport;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a job's alerts are delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    pub recipients: Vec<String>,
}

/// Delivers alert messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}

/// Subject and body for one job's alert batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotification {
    pub subject: String,
    pub body: String,
}

impl AlertNotification {
    pub fn new(job_id: &str, report: &MonitoringReport, alerts: &[String]) -> Self {
        let subject = format!("Monitoring alert for {}", report.target);

        let mut body = format!(
            "Job: {}\nTarget: {}\nObserved at: {}\n\nAlerts:\n",
            job_id,
            report.target,
            report.observed_at.to_rfc3339()
        );
        for alert in alerts {
            body.push_str("- ");
            body.push_str(alert);
            body.push('\n');
        }

        Self { subject, body }
    }
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        warn!(
            recipients = %recipients.join(", "),
            "{}\n{}",
            subject,
            body
        );
        Ok(())
    }
}

/// POSTs `{recipients, subject, body}` JSON to a URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Config(format!("webhook client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn payload(recipients: &[String], subject: &str, body: &str) -> serde_json::Value {
        json!({
            "recipients": recipients,
            "subject": subject,
            "body": body,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(recipients, subject, body))
            .send()
            .await
            .map_err(|e| MonitorError::ExternalService(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MonitorError::ExternalService(format!(
                "webhook returned status {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_notification_text() {
        let report = sample_report();
        let alerts = vec![
            "Domain expires in 10 days (threshold 30 days)".to_string(),
            "Site is offline (HTTP 503)".to_string(),
        ];
        let n = AlertNotification::new("homepage", &report, &alerts);
        assert_eq!(n.subject, "Monitoring alert for https://example.com");
        assert!(n.body.starts_with("Job: homepage\nTarget: https://example.com\n"));
        assert!(n.body.contains("- Domain expires in 10 days"));
        assert!(n.body.ends_with("- Site is offline (HTTP 503)\n"));
    }

    #[test]
    fn test_webhook_payload() {
        let payload = WebhookNotifier::payload(&["ops@example.com".to_string()], "s", "b");
        assert_eq!(payload["recipients"][0], "ops@example.com");
        assert_eq!(payload["subject"], "s");
        assert_eq!(payload["body"], "b");
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        tokio_test::assert_ok!(LogNotifier.send(&["a@example.com".to_string()], "s", "b").await);
    }
}
