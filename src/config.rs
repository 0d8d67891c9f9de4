//! Configuration module for pulsecheck.
//!
//! Loads configuration from environment variables with sensible defaults,
//! plus the optional JSON file of job definitions.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MonitorError, Result};
use crate::scheduler::JobConfig;

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// User-Agent for HTTP and RDAP requests (default: "pulsecheck/<version>")
    pub user_agent: String,
    /// Structured registry base URL (default: "https://rdap.org/domain/")
    pub rdap_base_url: String,
    /// Free-text registry command (default: "whois")
    pub whois_command: String,
    /// Ping command (default: "ping")
    pub ping_command: String,
    /// Alert webhook; alerts go to the log when unset
    pub webhook_url: Option<String>,
    /// JSON file of jobs registered at start-up
    pub jobs_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("pulsecheck/{}", env!("CARGO_PKG_VERSION")),
            rdap_base_url: "https://rdap.org/domain/".to_string(),
            whois_command: "whois".to_string(),
            ping_command: "ping".to_string(),
            webhook_url: None,
            jobs_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PULSECHECK_USER_AGENT`
    /// - `PULSECHECK_RDAP_BASE_URL`
    /// - `PULSECHECK_WHOIS_COMMAND`
    /// - `PULSECHECK_PING_COMMAND`
    /// - `PULSECHECK_WEBHOOK_URL`
    /// - `PULSECHECK_JOBS_FILE`
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user_agent) = var("PULSECHECK_USER_AGENT") {
            cfg.user_agent = user_agent;
        }
        if let Some(base_url) = var("PULSECHECK_RDAP_BASE_URL") {
            cfg.rdap_base_url = base_url;
        }
        if let Some(whois) = var("PULSECHECK_WHOIS_COMMAND") {
            cfg.whois_command = whois;
        }
        if let Some(ping) = var("PULSECHECK_PING_COMMAND") {
            cfg.ping_command = ping;
        }
        cfg.webhook_url = var("PULSECHECK_WEBHOOK_URL");
        cfg.jobs_file = var("PULSECHECK_JOBS_FILE").map(PathBuf::from);

        cfg
    }
}

/// One entry of the jobs file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub config: JobConfig,
}

/// Read job definitions from a JSON array file.
pub fn load_job_definitions(path: &Path) -> Result<Vec<JobDefinition>> {
    let text = fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("cannot read {}: {}", path.display(), e)))?;

    serde_json::from_str(&text).map_err(|e| MonitorError::Parse {
        message: format!("invalid jobs file {}: {}", path.display(), e),
        raw: text.chars().take(200).collect(),
    })
}
