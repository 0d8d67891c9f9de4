//! Network probes.
//!
//! Each probe takes the raw target string, derives its own host/port, and
//! returns its report category directly. Faults never escape a probe; they
//! become the category's error status.

mod dns;
mod http;
mod ping;
mod ports;
mod tls;

pub use dns::*;
pub use http::*;
pub use ping::*;
pub use ports::*;
pub use tls::*;

use std::time::Duration;
use thiserror::Error;

/// Request timeout for availability and keyword probes.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Connect + handshake timeout for the certificate probe.
pub const TLS_TIMEOUT: Duration = Duration::from_secs(5);
/// Connect timeout per scanned port.
pub const PORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Probe error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("{message}: {raw}")]
    Parse { message: String, raw: String },
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// Run `fut` under `limit`, mapping expiry to `ProbeError::Timeout`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ProbeError>
where
    F: std::future::Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(limit)),
    }
}
