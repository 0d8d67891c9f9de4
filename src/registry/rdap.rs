//! Structured registry lookups (RDAP).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::probe::ProbeError;

const RDAP_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of an RDAP `events` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEvent {
    pub event_action: String,
    pub event_date: String,
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RegistryEvent>,
}

#[async_trait]
pub trait StructuredRegistry: Send + Sync {
    async fn events(&self, domain: &str) -> Result<Vec<RegistryEvent>, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct RdapClient {
    http: reqwest::Client,
    base_url: String,
}

impl RdapClient {
    /// `base_url` is joined with the domain, e.g. `https://rdap.org/domain/`.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            .timeout(RDAP_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { http, base_url })
    }
}

#[async_trait]
impl StructuredRegistry for RdapClient {
    async fn events(&self, domain: &str) -> Result<Vec<RegistryEvent>, ProbeError> {
        let url = format!("{}{}", self.base_url, domain);
        debug!(url = %url, "Querying RDAP");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| ProbeError::ExternalService(format!("RDAP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProbeError::ExternalService(format!(
                "RDAP returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: RdapDomain = response.json().await.map_err(|e| ProbeError::Parse {
            message: "malformed RDAP payload".to_string(),
            raw: e.to_string(),
        })?;

        Ok(body.events)
    }
}

/// Date of the first event whose action mentions expiry.
pub fn expiry_event_date(events: &[RegistryEvent]) -> Option<&str> {
    events
        .iter()
        .find(|e| e.event_action.to_lowercase().contains("expir"))
        .map(|e| e.event_date.as_str())
}
