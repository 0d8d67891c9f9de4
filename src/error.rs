//! Error taxonomy shared by the engine and the job registry.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by monitoring operations.
///
/// Probe-level failures never show up here; they are folded into the report
/// as error-status entries. What remains are job-management and engine-level
/// outcomes that callers must react to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {message} (raw: {raw:?})")]
    Parse { message: String, raw: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("external service error: {0}")]
    ExternalService(String),
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job already registered: {0}")]
    DuplicateJob(String),
    #[error("run cancelled")]
    Cancelled,
}

impl MonitorError {
    /// Stable machine-readable kind for the structured error body.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Network(_) => "network_error",
            MonitorError::Parse { .. } => "parse_error",
            MonitorError::Config(_) => "config_error",
            MonitorError::ExternalService(_) => "external_service_error",
            MonitorError::NotFound(_) => "not_found_error",
            MonitorError::DuplicateJob(_) => "duplicate_job_error",
            MonitorError::Cancelled => "cancelled",
        }
    }
}

/// Structured `{errorKind, message}` body handed to CLI/API layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_kind: String,
    pub message: String,
}

impl From<&MonitorError> for ErrorBody {
    fn from(err: &MonitorError) -> Self {
        Self {
            error_kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
