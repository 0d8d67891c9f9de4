//! Probe aggregation.
//!
//! `Monitor` runs every probe against one target and fuses the results into a
//! `MonitoringReport`. Probes run concurrently; each derives its own host and
//! port from the target string, so a malformed target or a slow collaborator
//! only affects its own category.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::AppConfig;
use crate::error::{MonitorError, Result};
use crate::probe::{
    check_availability, check_certificate, check_keyword, check_ping, resolve_dns, scan_ports,
    CertificateSource, CommandPing, DnsLookup, HttpFetcher, NativeTlsSource, PingRunner,
    ReqwestFetcher, SystemDns, TcpConnector, TokioConnector,
};
use crate::registry::{
    DomainExpiryResolver, FreeTextRegistry, RdapClient, StructuredRegistry, WhoisCommand,
};
use crate::report::MonitoringReport;

/// External collaborators the probes talk to.
#[derive(Clone)]
pub struct ProbeBackends {
    pub http: Arc<dyn HttpFetcher>,
    pub dns: Arc<dyn DnsLookup>,
    pub tls: Arc<dyn CertificateSource>,
    pub tcp: Arc<dyn TcpConnector>,
    pub ping: Arc<dyn PingRunner>,
    pub structured_registry: Arc<dyn StructuredRegistry>,
    pub free_text_registry: Arc<dyn FreeTextRegistry>,
}

impl ProbeBackends {
    /// Real network backends configured from `config`.
    pub fn system(config: &AppConfig) -> Result<Self> {
        let http = ReqwestFetcher::new(&config.user_agent)
            .map_err(|e| MonitorError::Config(format!("HTTP client: {}", e)))?;
        let rdap = RdapClient::new(&config.rdap_base_url, &config.user_agent)
            .map_err(|e| MonitorError::Config(format!("RDAP client: {}", e)))?;

        Ok(Self {
            http: Arc::new(http),
            dns: Arc::new(SystemDns::new()),
            tls: Arc::new(NativeTlsSource),
            tcp: Arc::new(TokioConnector),
            ping: Arc::new(CommandPing::new(config.ping_command.clone())),
            structured_registry: Arc::new(rdap),
            free_text_registry: Arc::new(WhoisCommand::new(config.whois_command.clone())),
        })
    }
}

/// The probe-aggregation engine.
#[derive(Clone)]
pub struct Monitor {
    backends: ProbeBackends,
    domain_expiry: DomainExpiryResolver,
}

impl Monitor {
    pub fn new(backends: ProbeBackends) -> Self {
        let domain_expiry = DomainExpiryResolver::new(
            backends.structured_registry.clone(),
            backends.free_text_registry.clone(),
        );
        Self {
            backends,
            domain_expiry,
        }
    }

    /// Run every probe against `target` and assemble the report.
    ///
    /// Never fails: probe faults are recorded inline as error-status entries.
    /// A blank keyword counts as no keyword.
    #[instrument(skip(self))]
    pub async fn run(&self, target: &str, keyword: Option<&str>) -> MonitoringReport {
        let observed_at = Utc::now();
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let b = &self.backends;

        let (
            (availability, latency),
            dns,
            ssl,
            domain_expiry,
            ports,
            ping,
            keyword,
        ) = tokio::join!(
            check_availability(b.http.as_ref(), target),
            resolve_dns(b.dns.as_ref(), target),
            check_certificate(b.tls.as_ref(), target),
            self.domain_expiry.check(target),
            scan_ports(b.tcp.clone(), target),
            check_ping(b.ping.as_ref(), target),
            async {
                match keyword {
                    Some(k) => Some(check_keyword(b.http.as_ref(), target, k).await),
                    None => None,
                }
            },
        );

        let report = MonitoringReport {
            target: target.to_string(),
            observed_at,
            availability,
            latency,
            dns,
            ssl,
            domain_expiry,
            ports,
            ping,
            keyword,
        };

        debug!(
            target = %target,
            health = report.health_score(),
            "Monitoring run complete"
        );

        report
    }

    /// Like [`Monitor::run`], but abandons all in-flight probe I/O once
    /// `cancel` fires.
    pub async fn run_cancellable(
        &self,
        target: &str,
        keyword: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<MonitoringReport> {
        tokio::select! {
            _ = cancel.cancelled() => Err(MonitorError::Cancelled),
            report = self.run(target, keyword) => Ok(report),
        }
    }
}
