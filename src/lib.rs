//! pulsecheck - website health monitoring.
//!
//! Runs independent probes (availability, latency, DNS, TLS certificate,
//! domain registration, ports, ping, content keyword) against a target and
//! fuses them into one report. The scheduler repeats those runs on cron
//! schedules and raises threshold alerts.

pub mod alerts;
pub mod config;
pub mod dates;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod target;

#[cfg(test)]
mod testing;

pub use error::{ErrorBody, MonitorError, Result};
pub use monitor::{Monitor, ProbeBackends};
pub use report::MonitoringReport;
pub use scheduler::{JobConfig, MonitoringJob, Scheduler};
