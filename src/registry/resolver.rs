//! Domain expiry resolution with layered fallbacks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::domain::registrable_domain;
use super::extract::{find_labeled_expiry, find_loose_expiry, sample};
use super::rdap::{expiry_event_date, StructuredRegistry};
use super::whois::FreeTextRegistry;
use crate::dates::{days_until, normalize_date};
use crate::probe::{with_timeout, ProbeError};
use crate::report::{DomainExpiry, ExpiryStatus};
use crate::target::TargetAddr;

/// Upper bound for each registry stage.
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the expiry candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySource {
    Structured,
    Labeled,
    LooseScan,
}

/// Resolves a domain's registration expiry.
///
/// Stages, each non-fatal to the next: structured registry events, labeled
/// fields in free-text output, then a loose line scan. The winning candidate
/// goes through the date normalizer.
#[derive(Clone)]
pub struct DomainExpiryResolver {
    structured: Arc<dyn StructuredRegistry>,
    free_text: Arc<dyn FreeTextRegistry>,
}

impl DomainExpiryResolver {
    pub fn new(structured: Arc<dyn StructuredRegistry>, free_text: Arc<dyn FreeTextRegistry>) -> Self {
        Self {
            structured,
            free_text,
        }
    }

    /// Expiry instant for the registrable domain of `host`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, host: &str) -> Result<(DateTime<Utc>, ExpirySource), ProbeError> {
        let domain = registrable_domain(host)
            .ok_or_else(|| ProbeError::Config(format!("no registrable domain for {:?}", host)))?;

        let (candidate, source) = self.find_candidate(&domain).await?;
        debug!(domain = %domain, candidate = %candidate, ?source, "Expiry candidate found");

        let expiry = normalize_date(&candidate)?;
        Ok((expiry, source))
    }

    async fn find_candidate(&self, domain: &str) -> Result<(String, ExpirySource), ProbeError> {
        match with_timeout(REGISTRY_TIMEOUT, self.structured.events(domain)).await {
            Ok(events) => match expiry_event_date(&events) {
                Some(date) => return Ok((date.to_string(), ExpirySource::Structured)),
                None => debug!(domain = %domain, "No expiry event in structured registry data"),
            },
            Err(e) => debug!(domain = %domain, "Structured registry lookup failed: {}", e),
        }

        let text = with_timeout(REGISTRY_TIMEOUT, self.free_text.query(domain)).await?;

        if let Some(value) = find_labeled_expiry(&text) {
            return Ok((value, ExpirySource::Labeled));
        }
        if let Some(value) = find_loose_expiry(&text) {
            return Ok((value, ExpirySource::LooseScan));
        }

        Err(ProbeError::Parse {
            message: "no expiry date in registry output".to_string(),
            raw: sample(&text),
        })
    }

    /// Resolve and classify the target's domain expiry.
    pub async fn check(&self, target: &str) -> DomainExpiry {
        let addr = match TargetAddr::parse(target) {
            Ok(addr) => addr,
            Err(e) => return DomainExpiry::error(e.to_string()),
        };

        match self.resolve(&addr.host).await {
            Ok((expiry, _)) => {
                let days = days_until(expiry, Utc::now());
                DomainExpiry {
                    status: ExpiryStatus::from_days(days),
                    expires_at: Some(expiry),
                    days_to_expiry: Some(days),
                    error: None,
                }
            }
            Err(e) => {
                tracing::debug!("Domain expiry probe failed for {}: {}", target, e);
                DomainExpiry::error(e.to_string())
            }
        }
    }
}
