//! Free-text registry lookups via the system `whois` tool.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::probe::ProbeError;

#[async_trait]
pub trait FreeTextRegistry: Send + Sync {
    /// Raw registry text for `domain`.
    async fn query(&self, domain: &str) -> Result<String, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct WhoisCommand {
    program: String,
}

impl WhoisCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for WhoisCommand {
    fn default() -> Self {
        Self::new("whois")
    }
}

#[async_trait]
impl FreeTextRegistry for WhoisCommand {
    async fn query(&self, domain: &str) -> Result<String, ProbeError> {
        let output = Command::new(&self.program)
            .arg(domain)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::ExternalService(format!("failed to execute whois: {}", e)))?;

        // whois exits non-zero on partial answers; keep whatever it printed.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        if text.trim().is_empty() {
            return Err(ProbeError::ExternalService(format!(
                "whois returned no output (exit status {})",
                output.status
            )));
        }

        Ok(text)
    }
}
