//! DNS resolution probe.

use std::fmt;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use super::ProbeError;
use crate::report::{DnsRecords, DnsStatus};
use crate::target::TargetAddr;

/// Record types collected for every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Mx,
    Txt,
    Ns,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::A => "A",
            RecordKind::Mx => "MX",
            RecordKind::Txt => "TXT",
            RecordKind::Ns => "NS",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup(&self, host: &str, kind: RecordKind) -> Result<Vec<String>, ProbeError>;
}

/// Resolver backed by the system configuration, with hickory's defaults as a fallback.
#[derive(Clone)]
pub struct SystemDns {
    resolver: TokioAsyncResolver,
}

impl SystemDns {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            tracing::warn!("System resolver config unavailable ({}), using defaults", e);
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for SystemDns {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsLookup for SystemDns {
    async fn lookup(&self, host: &str, kind: RecordKind) -> Result<Vec<String>, ProbeError> {
        let failed = |e: hickory_resolver::error::ResolveError| {
            ProbeError::Network(format!("{} lookup failed: {}", kind, e))
        };

        let records = match kind {
            RecordKind::A => self
                .resolver
                .ipv4_lookup(host)
                .await
                .map_err(failed)?
                .iter()
                .map(|a| a.to_string())
                .collect(),
            RecordKind::Mx => {
                let response = self.resolver.mx_lookup(host).await.map_err(failed)?;
                let mut mx: Vec<_> = response.iter().collect();
                mx.sort_by_key(|r| r.preference());
                mx.iter()
                    .map(|r| trim_root(&r.exchange().to_string()))
                    .collect()
            }
            RecordKind::Txt => self
                .resolver
                .txt_lookup(host)
                .await
                .map_err(failed)?
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                        .collect::<String>()
                })
                .collect(),
            RecordKind::Ns => self
                .resolver
                .ns_lookup(host)
                .await
                .map_err(failed)?
                .iter()
                .map(|ns| trim_root(&ns.to_string()))
                .collect(),
        };

        Ok(records)
    }
}

fn trim_root(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// Resolve A, MX, TXT and NS concurrently.
///
/// A failed record type becomes an empty set; only an unparseable target
/// fails the whole category.
pub async fn resolve_dns(lookup: &dyn DnsLookup, target: &str) -> DnsRecords {
    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => return DnsRecords::error(e.to_string()),
    };
    let host = addr.host.as_str();

    let (a, mx, txt, ns) = tokio::join!(
        lookup_or_empty(lookup, host, RecordKind::A),
        lookup_or_empty(lookup, host, RecordKind::Mx),
        lookup_or_empty(lookup, host, RecordKind::Txt),
        lookup_or_empty(lookup, host, RecordKind::Ns),
    );

    DnsRecords {
        status: DnsStatus::Resolved,
        a,
        mx,
        txt,
        ns,
        error: None,
    }
}

async fn lookup_or_empty(lookup: &dyn DnsLookup, host: &str, kind: RecordKind) -> Vec<String> {
    match lookup.lookup(host, kind).await {
        Ok(records) => records,
        Err(e) => {
            tracing::debug!("DNS {} lookup for {} degraded to empty: {}", kind, host, e);
            Vec::new()
        }
    }
}
