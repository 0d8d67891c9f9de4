//! Target URL parsing.
//!
//! Every probe parses the raw target string on its own. A malformed target
//! therefore fails each probe independently instead of aborting the run.

use url::Url;

use crate::probe::ProbeError;

/// Host and port derived from a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    pub url: Url,
    pub host: String,
    /// Explicit port from the URL, if any.
    pub port: Option<u16>,
}

impl TargetAddr {
    /// Parse a target URL, or fail with a probe-local configuration error.
    ///
    /// Bare hostnames (`example.com`) are accepted and treated as `https://`.
    pub fn parse(target: &str) -> Result<Self, ProbeError> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(ProbeError::Config("empty target".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| ProbeError::Config(format!("invalid target {:?}: {}", target, e)))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::Config(format!("target {:?} has no host", target)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase();

        Ok(Self {
            port: url.port(),
            host,
            url,
        })
    }

    /// Port for TLS connections: the explicit port, or 443.
    pub fn tls_port(&self) -> u16 {
        self.port.unwrap_or(443)
    }
}
