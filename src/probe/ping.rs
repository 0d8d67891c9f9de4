//! ICMP reachability probe via the system `ping` utility.

use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::ProbeError;
use crate::report::{Ping, PingStatus};
use crate::target::TargetAddr;

#[async_trait]
pub trait PingRunner: Send + Sync {
    /// Send one echo request and return the tool's textual output.
    async fn ping(&self, host: &str) -> Result<String, ProbeError>;
}

/// Runs the platform `ping` command with a single packet.
#[derive(Debug, Clone)]
pub struct CommandPing {
    program: String,
}

impl CommandPing {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandPing {
    fn default() -> Self {
        Self::new("ping")
    }
}

#[async_trait]
impl PingRunner for CommandPing {
    async fn ping(&self, host: &str) -> Result<String, ProbeError> {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };

        let output = Command::new(&self.program)
            .args([count_flag, "1", host])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

        // Exit status is ignored: an unanswered ping still prints parseable output.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

/// Ping the target host once.
///
/// Output without a round-trip time is `failed`; only a tool that cannot
/// run at all is `error`.
pub async fn check_ping(runner: &dyn PingRunner, target: &str) -> Ping {
    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => {
            return Ping {
                status: PingStatus::Error,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    match runner.ping(&addr.host).await {
        Ok(output) => match parse_ping_output(&output) {
            Some(ms) => Ping {
                status: PingStatus::Success,
                latency_ms: Some(ms),
                error: None,
            },
            None => Ping {
                status: PingStatus::Failed,
                latency_ms: None,
                error: Some("no reply".to_string()),
            },
        },
        Err(e) => {
            tracing::debug!("Ping probe failed for {}: {}", target, e);
            Ping {
                status: PingStatus::Error,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Parse ping command output for round-trip time in milliseconds.
pub fn parse_ping_output(output: &str) -> Option<f64> {
    // Pattern 1: Per-packet response "time=X.XXX ms" (Linux, macOS, Windows "time<1ms")
    static RE1: OnceLock<Regex> = OnceLock::new();
    let re1 = RE1.get_or_init(|| Regex::new(r"time[=<](?P<val>[0-9.]+)\s*ms").unwrap());

    if let Some(ms) = re1
        .captures(output)
        .and_then(|caps| caps.name("val"))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Some(ms);
    }

    // Pattern 2: Summary line, "round-trip min/avg/max/stddev" (macOS) or "rtt min/avg/max/mdev" (Linux)
    static RE2: OnceLock<Regex> = OnceLock::new();
    let re2 = RE2.get_or_init(|| {
        Regex::new(r"(?:round-trip|rtt)\s+min/avg/max/(?:stddev|mdev)\s*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)")
            .unwrap()
    });

    // Use average (second capture group)
    re2.captures(output)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
