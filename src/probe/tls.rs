//! TLS certificate probe.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use native_tls::TlsConnector;
use tokio::net::TcpStream;
use x509_parser::prelude::*;

use super::{with_timeout, ProbeError, TLS_TIMEOUT};
use crate::dates::days_until;
use crate::report::{ExpiryStatus, SslCertificate};
use crate::target::TargetAddr;

/// The fields read from a peer's leaf certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerCertificate {
    pub issuer: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn peer_certificate(&self, host: &str, port: u16) -> Result<PeerCertificate, ProbeError>;
}

/// Reads certificates with native-tls, accepting invalid chains so expired
/// certificates can still be inspected.
#[derive(Debug, Clone, Default)]
pub struct NativeTlsSource;

#[async_trait]
impl CertificateSource for NativeTlsSource {
    async fn peer_certificate(&self, host: &str, port: u16) -> Result<PeerCertificate, ProbeError> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| ProbeError::Network(format!("failed to connect: {}", e)))?;

        let tls_stream = connector
            .connect(host, stream)
            .await
            .map_err(|e| ProbeError::Network(format!("TLS handshake failed: {}", e)))?;

        let cert = tls_stream
            .get_ref()
            .peer_certificate()
            .map_err(|e| ProbeError::Network(e.to_string()))?
            .ok_or_else(|| ProbeError::Network("no peer certificate presented".to_string()))?;

        let der = cert
            .to_der()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        // Stream is dropped here, closing the connection.
        parse_certificate(&der)
    }
}

/// Extract issuer CN and validity window from a DER certificate.
pub fn parse_certificate(der: &[u8]) -> Result<PeerCertificate, ProbeError> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| ProbeError::Parse {
        message: "invalid certificate".to_string(),
        raw: e.to_string(),
    })?;

    let issuer = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    let validity = cert.validity();
    let valid_from = asn1_to_utc(validity.not_before)?;
    let valid_to = asn1_to_utc(validity.not_after)?;

    Ok(PeerCertificate {
        issuer,
        valid_from,
        valid_to,
    })
}

fn asn1_to_utc(time: ASN1Time) -> Result<DateTime<Utc>, ProbeError> {
    Utc.timestamp_opt(time.timestamp(), 0)
        .single()
        .ok_or_else(|| ProbeError::Parse {
            message: "certificate time out of range".to_string(),
            raw: time.to_string(),
        })
}

/// Connect to the target's TLS port and classify the certificate's expiry.
pub async fn check_certificate(source: &dyn CertificateSource, target: &str) -> SslCertificate {
    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => return SslCertificate::error(e.to_string()),
    };

    match with_timeout(
        TLS_TIMEOUT,
        source.peer_certificate(&addr.host, addr.tls_port()),
    )
    .await
    {
        Ok(cert) => {
            let days = days_until(cert.valid_to, Utc::now());
            SslCertificate {
                status: ExpiryStatus::from_days(days),
                issuer: cert.issuer,
                valid_from: Some(cert.valid_from),
                valid_to: Some(cert.valid_to),
                days_to_expiry: Some(days),
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!("Certificate probe failed for {}: {}", target, e);
            SslCertificate::error(e.to_string())
        }
    }
}
