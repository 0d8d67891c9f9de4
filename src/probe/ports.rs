//! TCP port exposure scan.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::PORT_TIMEOUT;
use crate::report::{PortResult, PortStatus, SCANNED_PORTS};
use crate::target::TargetAddr;

#[async_trait]
pub trait TcpConnector: Send + Sync {
    /// Open and immediately close a TCP connection.
    async fn connect(&self, host: &str, port: u16) -> io::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct TokioConnector;

#[async_trait]
impl TcpConnector for TokioConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<()> {
        TcpStream::connect((host, port)).await.map(drop)
    }
}

/// Probe every port in `SCANNED_PORTS`, one task per port.
///
/// Results come back in `SCANNED_PORTS` order regardless of completion order.
pub async fn scan_ports(connector: Arc<dyn TcpConnector>, target: &str) -> Vec<PortResult> {
    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => {
            let reason = e.to_string();
            return SCANNED_PORTS
                .iter()
                .map(|&port| error_result(port, reason.clone()))
                .collect();
        }
    };

    let mut tasks = JoinSet::new();
    for &port in SCANNED_PORTS.iter() {
        let connector = connector.clone();
        let host = addr.host.clone();
        tasks.spawn(async move { scan_port(connector.as_ref(), &host, port).await });
    }

    let mut results: HashMap<u16, PortResult> = HashMap::with_capacity(SCANNED_PORTS.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => {
                results.insert(result.port, result);
            }
            Err(e) => tracing::warn!("Port scan task for {} failed: {}", target, e),
        }
    }

    SCANNED_PORTS
        .iter()
        .map(|&port| {
            results
                .remove(&port)
                .unwrap_or_else(|| error_result(port, "scan task aborted".to_string()))
        })
        .collect()
}

/// Probe a single port with the per-port timeout.
pub async fn scan_port(connector: &dyn TcpConnector, host: &str, port: u16) -> PortResult {
    let start = Instant::now();
    match tokio::time::timeout(PORT_TIMEOUT, connector.connect(host, port)).await {
        Ok(Ok(())) => PortResult {
            port,
            status: PortStatus::Open,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => PortResult {
            port,
            status: PortStatus::Closed,
            latency_ms: None,
            error: None,
        },
        Ok(Err(e)) => error_result(port, e.to_string()),
        Err(_) => PortResult {
            port,
            status: PortStatus::Timeout,
            latency_ms: None,
            error: None,
        },
    }
}

fn error_result(port: u16, reason: String) -> PortResult {
    PortResult {
        port,
        status: PortStatus::Error,
        latency_ms: None,
        error: Some(reason),
    }
}
