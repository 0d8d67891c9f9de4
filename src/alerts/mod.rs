//! Alert threshold evaluation and dispatch.

mod notify;

pub use notify::*;

use serde::{Deserialize, Serialize};

use crate::report::{AvailabilityStatus, ExpiryStatus, MonitoringReport};

/// Per-job alert limits. An absent limit disables its check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
    /// Maximum acceptable response latency.
    pub latency_ms: Option<u64>,
    /// Minimum acceptable days until the certificate expires.
    pub ssl_expiry_days: Option<i64>,
    /// Minimum acceptable days until the domain registration expires.
    pub domain_expiry_days: Option<i64>,
}

/// Compare a report against thresholds.
///
/// All rules are evaluated independently; the result is ordered by rule and
/// empty when nothing needs attention. Expired certificates and domains, and
/// an unavailable target, alert even without thresholds.
pub fn evaluate(report: &MonitoringReport, thresholds: Option<&AlertThresholds>) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(t) = thresholds {
        if let (Some(max), Some(value)) = (t.latency_ms, report.latency.value_ms) {
            if value > max {
                alerts.push(format!(
                    "Latency of {}ms exceeds the {}ms threshold",
                    value, max
                ));
            }
        }

        if let (Some(min), Some(days)) = (t.ssl_expiry_days, report.ssl.days_to_expiry) {
            if days <= min {
                alerts.push(format!(
                    "SSL certificate expires in {} days (threshold {} days)",
                    days, min
                ));
            }
        }

        if let (Some(min), Some(days)) = (t.domain_expiry_days, report.domain_expiry.days_to_expiry) {
            if days <= min {
                alerts.push(format!(
                    "Domain expires in {} days (threshold {} days)",
                    days, min
                ));
            }
        }
    }

    match report.availability.status {
        AvailabilityStatus::Online => {}
        AvailabilityStatus::Offline => alerts.push(match report.availability.status_code {
            Some(code) => format!("Site is offline (HTTP {})", code),
            None => "Site is offline".to_string(),
        }),
        AvailabilityStatus::Error => alerts.push(format!(
            "Site is unreachable: {}",
            report.availability.error.as_deref().unwrap_or("unknown error")
        )),
    }

    if report.ssl.status == ExpiryStatus::Expired {
        alerts.push("SSL certificate has expired".to_string());
    }

    if report.domain_expiry.status == ExpiryStatus::Expired {
        alerts.push("Domain registration has expired".to_string());
    }

    alerts
}
