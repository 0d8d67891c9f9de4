//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use url::Url;

use crate::alerts::Notifier;
use crate::error::{MonitorError, Result};
use crate::monitor::ProbeBackends;
use crate::probe::{
    CertificateSource, DnsLookup, HttpFetcher, HttpResponse, PeerCertificate, PingRunner,
    ProbeError, RecordKind, TcpConnector,
};
use crate::registry::{FreeTextRegistry, RegistryEvent, StructuredRegistry};

#[derive(Clone)]
pub struct FakeHttp {
    response: std::result::Result<HttpResponse, ProbeError>,
    delay: Option<Duration>,
    calls: Arc<Mutex<usize>>,
}

impl FakeHttp {
    pub fn ok(status: u16, body: &str) -> Self {
        Self {
            response: Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
            delay: None,
            calls: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(ProbeError::Network(message.to_string())),
            delay: None,
            calls: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl HttpFetcher for FakeHttp {
    async fn get(&self, _url: &Url) -> std::result::Result<HttpResponse, ProbeError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

#[derive(Clone, Default)]
pub struct FakeDns {
    records: HashMap<RecordKind, Vec<String>>,
    failing: HashSet<RecordKind>,
    queried: Arc<Mutex<Vec<String>>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: RecordKind, values: &[&str]) -> Self {
        self.records
            .insert(kind, values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn failing(mut self, kind: RecordKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn failing_all(self) -> Self {
        self.failing(RecordKind::A)
            .failing(RecordKind::Mx)
            .failing(RecordKind::Txt)
            .failing(RecordKind::Ns)
    }

    pub fn queried_hosts(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsLookup for FakeDns {
    async fn lookup(&self, host: &str, kind: RecordKind) -> std::result::Result<Vec<String>, ProbeError> {
        self.queried.lock().unwrap().push(host.to_string());
        if self.failing.contains(&kind) {
            return Err(ProbeError::Network(format!("SERVFAIL for {} {}", kind, host)));
        }
        Ok(self.records.get(&kind).cloned().unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct FakeTls {
    certificate: std::result::Result<PeerCertificate, ProbeError>,
    delay: Option<Duration>,
    last_port: Arc<Mutex<Option<u16>>>,
}

impl FakeTls {
    /// A certificate issued by "Test CA" expiring `remaining` from now.
    pub fn expiring_in(remaining: ChronoDuration) -> Self {
        let now = Utc::now();
        Self {
            certificate: Ok(PeerCertificate {
                issuer: Some("Test CA".to_string()),
                valid_from: now - ChronoDuration::days(365),
                valid_to: now + remaining,
            }),
            delay: None,
            last_port: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            certificate: Err(ProbeError::Network(message.to_string())),
            delay: None,
            last_port: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_port(&self) -> Option<u16> {
        *self.last_port.lock().unwrap()
    }
}

#[async_trait]
impl CertificateSource for FakeTls {
    async fn peer_certificate(
        &self,
        _host: &str,
        port: u16,
    ) -> std::result::Result<PeerCertificate, ProbeError> {
        *self.last_port.lock().unwrap() = Some(port);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.certificate.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortBehavior {
    Refuse,
    /// Never answers.
    Hang,
    Open,
    Unreachable,
}

#[derive(Clone)]
pub struct FakeTcp {
    default: PortBehavior,
    overrides: HashMap<u16, PortBehavior>,
}

impl FakeTcp {
    pub fn all(behavior: PortBehavior) -> Self {
        Self {
            default: behavior,
            overrides: HashMap::new(),
        }
    }

    pub fn with_port(mut self, port: u16, behavior: PortBehavior) -> Self {
        self.overrides.insert(port, behavior);
        self
    }
}

#[async_trait]
impl TcpConnector for FakeTcp {
    async fn connect(&self, _host: &str, port: u16) -> io::Result<()> {
        match self.overrides.get(&port).copied().unwrap_or(self.default) {
            PortBehavior::Open => Ok(()),
            PortBehavior::Refuse => Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
            PortBehavior::Unreachable => Err(io::Error::new(
                io::ErrorKind::Other,
                "network is unreachable",
            )),
            PortBehavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone)]
pub struct FakePing {
    output: std::result::Result<String, ProbeError>,
    last_host: Arc<Mutex<Option<String>>>,
}

impl FakePing {
    pub fn output(text: &str) -> Self {
        Self {
            output: Ok(text.to_string()),
            last_host: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(ProbeError::Command(message.to_string())),
            last_host: Arc::default(),
        }
    }

    pub fn last_host(&self) -> Option<String> {
        self.last_host.lock().unwrap().clone()
    }
}

#[async_trait]
impl PingRunner for FakePing {
    async fn ping(&self, host: &str) -> std::result::Result<String, ProbeError> {
        *self.last_host.lock().unwrap() = Some(host.to_string());
        self.output.clone()
    }
}

#[derive(Clone)]
pub struct FakeRdap {
    events: std::result::Result<Vec<RegistryEvent>, ProbeError>,
    last_domain: Arc<Mutex<Option<String>>>,
}

impl FakeRdap {
    /// `(eventAction, eventDate)` pairs.
    pub fn events(events: &[(&str, &str)]) -> Self {
        Self {
            events: Ok(events
                .iter()
                .map(|(action, date)| RegistryEvent {
                    event_action: action.to_string(),
                    event_date: date.to_string(),
                })
                .collect()),
            last_domain: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            events: Err(ProbeError::ExternalService(message.to_string())),
            last_domain: Arc::default(),
        }
    }

    pub fn last_domain(&self) -> Option<String> {
        self.last_domain.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredRegistry for FakeRdap {
    async fn events(&self, domain: &str) -> std::result::Result<Vec<RegistryEvent>, ProbeError> {
        *self.last_domain.lock().unwrap() = Some(domain.to_string());
        self.events.clone()
    }
}

#[derive(Clone)]
pub struct FakeWhois {
    text: std::result::Result<String, ProbeError>,
    calls: Arc<Mutex<usize>>,
    last_domain: Arc<Mutex<Option<String>>>,
}

impl FakeWhois {
    pub fn text(text: &str) -> Self {
        Self {
            text: Ok(text.to_string()),
            calls: Arc::default(),
            last_domain: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            text: Err(ProbeError::ExternalService(message.to_string())),
            calls: Arc::default(),
            last_domain: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn last_domain(&self) -> Option<String> {
        self.last_domain.lock().unwrap().clone()
    }
}

#[async_trait]
impl FreeTextRegistry for FakeWhois {
    async fn query(&self, domain: &str) -> std::result::Result<String, ProbeError> {
        *self.calls.lock().unwrap() += 1;
        *self.last_domain.lock().unwrap() = Some(domain.to_string());
        self.text.clone()
    }
}

/// One dispatched notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Records every dispatch; optionally fails each one after recording it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentNotification {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            return Err(MonitorError::ExternalService("mail relay down".to_string()));
        }
        Ok(())
    }
}

/// Backends for a healthy target: HTTP 200 after 150ms, certificate valid for
/// 200 days, domain expiring in 10 days, only 443 open, ping 12ms.
pub fn healthy_backends() -> ProbeBackends {
    let domain_expiry = (Utc::now() + ChronoDuration::days(10)).to_rfc3339();
    ProbeBackends {
        http: Arc::new(
            FakeHttp::ok(200, "<html>welcome</html>").with_delay(Duration::from_millis(150)),
        ),
        dns: Arc::new(
            FakeDns::new()
                .with(RecordKind::A, &["192.0.2.10"])
                .with(RecordKind::Mx, &["mail.example.com"]),
        ),
        tls: Arc::new(FakeTls::expiring_in(ChronoDuration::days(200))),
        tcp: Arc::new(FakeTcp::all(PortBehavior::Refuse).with_port(443, PortBehavior::Open)),
        ping: Arc::new(FakePing::output(
            "64 bytes from 192.0.2.10: icmp_seq=1 ttl=57 time=12 ms",
        )),
        structured_registry: Arc::new(FakeRdap::events(&[(
            "expiration",
            domain_expiry.as_str(),
        )])),
        free_text_registry: Arc::new(FakeWhois::text("")),
    }
}
