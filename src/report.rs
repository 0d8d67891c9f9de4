//! Monitoring report model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ports probed by every scan, in report order.
pub const SCANNED_PORTS: [u16; 14] = [
    21, 22, 23, 25, 53, 80, 110, 143, 443, 993, 995, 3306, 5432, 8080,
];

/// Days-to-expiry at or below which a certificate or domain is "expiring soon".
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Tagged outcome of a single probe category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Degraded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Online,
    Offline,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub status: AvailabilityStatus,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl Availability {
    pub fn from_status_code(code: u16) -> Self {
        let status = if (200..400).contains(&code) {
            AvailabilityStatus::Online
        } else {
            AvailabilityStatus::Offline
        };
        Self {
            status,
            status_code: Some(code),
            error: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: AvailabilityStatus::Error,
            status_code: None,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyBucket {
    Good,
    Warning,
    Critical,
}

impl LatencyBucket {
    pub fn from_millis(ms: u64) -> Self {
        if ms < 1000 {
            LatencyBucket::Good
        } else if ms < 3000 {
            LatencyBucket::Warning
        } else {
            LatencyBucket::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Latency {
    /// Wall-clock request time; `None` when the request failed.
    pub value_ms: Option<u64>,
    pub bucket: LatencyBucket,
}

impl Latency {
    pub fn measured(ms: u64) -> Self {
        Self {
            value_ms: Some(ms),
            bucket: LatencyBucket::from_millis(ms),
        }
    }

    pub fn failed() -> Self {
        Self {
            value_ms: None,
            bucket: LatencyBucket::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsStatus {
    Resolved,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecords {
    pub status: DnsStatus,
    pub a: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
    pub ns: Vec<String>,
    pub error: Option<String>,
}

impl DnsRecords {
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: DnsStatus::Error,
            a: Vec::new(),
            mx: Vec::new(),
            txt: Vec::new(),
            ns: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

/// Classification shared by certificates and domain registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Valid,
    ExpiringSoon,
    Expired,
    Error,
}

impl ExpiryStatus {
    /// `>30` valid, `1..=30` expiring soon, `<=0` expired.
    pub fn from_days(days: i64) -> Self {
        if days > EXPIRY_WARNING_DAYS {
            ExpiryStatus::Valid
        } else if days > 0 {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Expired
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificate {
    pub status: ExpiryStatus,
    pub issuer: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub days_to_expiry: Option<i64>,
    pub error: Option<String>,
}

impl SslCertificate {
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ExpiryStatus::Error,
            issuer: None,
            valid_from: None,
            valid_to: None,
            days_to_expiry: None,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainExpiry {
    pub status: ExpiryStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_to_expiry: Option<i64>,
    pub error: Option<String>,
}

impl DomainExpiry {
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ExpiryStatus::Error,
            expires_at: None,
            days_to_expiry: None,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Open,
    Closed,
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortResult {
    pub port: u16,
    pub status: PortStatus,
    /// Connect time, only for open ports.
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingStatus {
    Success,
    Failed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    pub status: PingStatus,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordStatus {
    Found,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMatch {
    pub keyword: String,
    pub status: KeywordStatus,
    pub occurrences: usize,
    pub error: Option<String>,
}

/// One complete aggregator run against a target.
///
/// Every category is always present; a failed probe is recorded with its
/// category's error status. `keyword` is the only optional category and is
/// present exactly when a keyword was supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
    pub target: String,
    pub observed_at: DateTime<Utc>,
    pub availability: Availability,
    pub latency: Latency,
    pub dns: DnsRecords,
    pub ssl: SslCertificate,
    pub domain_expiry: DomainExpiry,
    pub ports: Vec<PortResult>,
    pub ping: Ping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<KeywordMatch>,
}

impl MonitoringReport {
    /// Result for one scanned port.
    pub fn port(&self, port: u16) -> Option<&PortResult> {
        self.ports.iter().find(|p| p.port == port)
    }

    /// Tagged outcome per category, in report order.
    pub fn outcomes(&self) -> Vec<(&'static str, Outcome)> {
        let mut outcomes = vec![
            (
                "availability",
                match self.availability.status {
                    AvailabilityStatus::Online => Outcome::Ok,
                    AvailabilityStatus::Offline => Outcome::Degraded,
                    AvailabilityStatus::Error => Outcome::Failed,
                },
            ),
            (
                "latency",
                match (self.latency.value_ms, self.latency.bucket) {
                    (None, _) => Outcome::Failed,
                    (Some(_), LatencyBucket::Good) => Outcome::Ok,
                    (Some(_), _) => Outcome::Degraded,
                },
            ),
            (
                "dns",
                match self.dns.status {
                    DnsStatus::Resolved if self.dns.a.is_empty() => Outcome::Degraded,
                    DnsStatus::Resolved => Outcome::Ok,
                    DnsStatus::Error => Outcome::Failed,
                },
            ),
            ("ssl", expiry_outcome(self.ssl.status)),
            ("domainExpiry", expiry_outcome(self.domain_expiry.status)),
            ("ports", self.ports_outcome()),
            (
                "ping",
                match self.ping.status {
                    PingStatus::Success => Outcome::Ok,
                    PingStatus::Failed => Outcome::Degraded,
                    PingStatus::Error => Outcome::Failed,
                },
            ),
        ];

        if let Some(keyword) = &self.keyword {
            outcomes.push((
                "keyword",
                match keyword.status {
                    KeywordStatus::Found => Outcome::Ok,
                    KeywordStatus::NotFound => Outcome::Degraded,
                    KeywordStatus::Error => Outcome::Failed,
                },
            ));
        }

        outcomes
    }

    /// Single-report health score from 0 to 100.
    pub fn health_score(&self) -> u8 {
        let outcomes = self.outcomes();
        if outcomes.is_empty() {
            return 0;
        }
        let total: f64 = outcomes
            .iter()
            .map(|(_, o)| match o {
                Outcome::Ok => 1.0,
                Outcome::Degraded => 0.5,
                Outcome::Failed => 0.0,
            })
            .sum();
        ((total / outcomes.len() as f64) * 100.0).round() as u8
    }

    fn ports_outcome(&self) -> Outcome {
        if self.ports.is_empty() || self.ports.iter().all(|p| p.status == PortStatus::Error) {
            Outcome::Failed
        } else if self.ports.iter().any(|p| p.status == PortStatus::Error) {
            Outcome::Degraded
        } else {
            Outcome::Ok
        }
    }
}

fn expiry_outcome(status: ExpiryStatus) -> Outcome {
    match status {
        ExpiryStatus::Valid => Outcome::Ok,
        ExpiryStatus::ExpiringSoon => Outcome::Degraded,
        ExpiryStatus::Expired | ExpiryStatus::Error => Outcome::Failed,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A healthy report used across module tests.
    pub(crate) fn sample_report() -> MonitoringReport {
        MonitoringReport {
            target: "https://example.com".to_string(),
            observed_at: Utc::now(),
            availability: Availability::from_status_code(200),
            latency: Latency::measured(150),
            dns: DnsRecords {
                status: DnsStatus::Resolved,
                a: vec!["93.184.216.34".to_string()],
                mx: Vec::new(),
                txt: Vec::new(),
                ns: vec!["a.iana-servers.net.".to_string()],
                error: None,
            },
            ssl: SslCertificate {
                status: ExpiryStatus::Valid,
                issuer: Some("R3".to_string()),
                valid_from: None,
                valid_to: None,
                days_to_expiry: Some(200),
                error: None,
            },
            domain_expiry: DomainExpiry {
                status: ExpiryStatus::Valid,
                expires_at: None,
                days_to_expiry: Some(365),
                error: None,
            },
            ports: SCANNED_PORTS
                .iter()
                .map(|&port| PortResult {
                    port,
                    status: PortStatus::Closed,
                    latency_ms: None,
                    error: None,
                })
                .collect(),
            ping: Ping {
                status: PingStatus::Success,
                latency_ms: Some(12.0),
                error: None,
            },
            keyword: None,
        }
    }

    #[test]
    fn test_expiry_classification_boundaries() {
        assert_eq!(ExpiryStatus::from_days(31), ExpiryStatus::Valid);
        assert_eq!(ExpiryStatus::from_days(30), ExpiryStatus::ExpiringSoon);
        assert_eq!(ExpiryStatus::from_days(1), ExpiryStatus::ExpiringSoon);
        assert_eq!(ExpiryStatus::from_days(0), ExpiryStatus::Expired);
        assert_eq!(ExpiryStatus::from_days(-12), ExpiryStatus::Expired);
    }

    #[test]
    fn test_latency_buckets() {
        assert_eq!(LatencyBucket::from_millis(999), LatencyBucket::Good);
        assert_eq!(LatencyBucket::from_millis(1000), LatencyBucket::Warning);
        assert_eq!(LatencyBucket::from_millis(2999), LatencyBucket::Warning);
        assert_eq!(LatencyBucket::from_millis(3000), LatencyBucket::Critical);
        assert_eq!(Latency::failed().bucket, LatencyBucket::Critical);
    }

    #[test]
    fn test_availability_from_status_code() {
        assert_eq!(
            Availability::from_status_code(301).status,
            AvailabilityStatus::Online
        );
        assert_eq!(
            Availability::from_status_code(404).status,
            AvailabilityStatus::Offline
        );
        assert_eq!(
            Availability::from_status_code(199).status,
            AvailabilityStatus::Offline
        );
    }

    #[test]
    fn test_health_score() {
        let mut report = sample_report();
        assert_eq!(report.health_score(), 100);

        report.ping.status = PingStatus::Error;
        report.ssl = SslCertificate::error("handshake failed");
        // 5 of 7 categories healthy
        assert_eq!(report.health_score(), 71);
    }

    #[test]
    fn test_keyword_omitted_from_json_when_absent() {
        let report = sample_report();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("keyword").is_none());
        assert_eq!(json["domainExpiry"]["status"], "valid");
        assert_eq!(json["ports"].as_array().unwrap().len(), SCANNED_PORTS.len());
    }
}
