//! Job registry and cron-driven scheduler.
//!
//! Each registered job gets its own timer task. A tick spawns one execution
//! (probe run, report bookkeeping, alert evaluation, notification) unless the
//! job already has one in flight, in which case the tick is skipped.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::alerts::{evaluate, AlertNotification, AlertThresholds, NotificationChannel, Notifier};
use crate::error::{MonitorError, Result};
use crate::monitor::Monitor;
use crate::report::MonitoringReport;

/// Upper bound of the random delay before a scheduled run.
const MAX_JITTER_MS: u64 = 100;

/// What a job monitors and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub target: String,
    #[serde(default)]
    pub keyword: Option<String>,
    /// Cron expression, five fields or six/seven with leading seconds.
    pub schedule: String,
    #[serde(default)]
    pub alert_thresholds: Option<AlertThresholds>,
    #[serde(default)]
    pub notification: Option<NotificationChannel>,
}

impl JobConfig {
    /// Check required fields and parse the schedule.
    pub fn validate(&self) -> Result<Schedule> {
        if self.target.trim().is_empty() {
            return Err(MonitorError::Config("target is required".to_string()));
        }
        if self.schedule.trim().is_empty() {
            return Err(MonitorError::Config("schedule is required".to_string()));
        }
        parse_schedule(&self.schedule)
    }
}

/// Parse a cron expression.
///
/// Classic five-field expressions run at second 0 and number weekdays the
/// crontab way (0 or 7 is Sunday, 1 is Monday). Six- and seven-field
/// expressions use the `cron` crate's own syntax.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let expr = expr.trim();
    let invalid = |reason: String| MonitorError::Config(format!("invalid schedule {:?}: {}", expr, reason));

    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = if fields.len() == 5 {
        let day_of_week = crontab_day_of_week(fields[4]).map_err(invalid)?;
        format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], day_of_week)
    } else {
        expr.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Rewrite numeric crontab weekdays (0-7, Sunday = 0 or 7) as day names.
/// Named items pass through untouched.
fn crontab_day_of_week(field: &str) -> std::result::Result<String, String> {
    let mut items = Vec::new();

    for item in field.split(',') {
        if item == "?" || item.chars().any(|c| c.is_ascii_alphabetic()) {
            items.push(item.to_string());
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => match step.parse::<usize>() {
                Ok(step) if step > 0 => (range, step),
                _ => return Err(format!("bad day-of-week step in {:?}", item)),
            },
            None => (item, 1),
        };
        let (start, end) = if range == "*" {
            (0, 7)
        } else {
            match range.split_once('-') {
                Some((from, to)) => (weekday_number(from)?, weekday_number(to)?),
                // "5/2" runs from 5 to the end of the week.
                None if step > 1 => (weekday_number(range)?, 7),
                None => {
                    let day = weekday_number(range)?;
                    (day, day)
                }
            }
        };
        if start > end {
            return Err(format!("day-of-week range {:?} runs backwards", range));
        }

        if range == "*" && step == 1 {
            items.push("*".to_string());
            continue;
        }
        let mut days: Vec<usize> = (start..=end).step_by(step).map(|d| d % 7).collect();
        days.sort_unstable();
        days.dedup();
        items.extend(days.into_iter().map(|d| WEEKDAY_NAMES[d].to_string()));
    }

    Ok(items.join(","))
}

fn weekday_number(text: &str) -> std::result::Result<usize, String> {
    match text.parse::<usize>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("day of week {:?} is not in 0-7", text)),
    }
}

/// A registered job and the outcome of its latest execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringJob {
    pub id: String,
    pub config: JobConfig,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_report: Option<MonitoringReport>,
}

/// Shared collaborators for job executions.
#[derive(Clone)]
struct Runner {
    monitor: Arc<Monitor>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
struct JobEntry {
    id: String,
    job: Arc<RwLock<MonitoringJob>>,
    stop: CancellationToken,
    /// One permit: at most one execution in flight per job id. Survives
    /// config updates.
    run_lock: Arc<Semaphore>,
    /// Which execution holds `run_lock`, and the last one that finished.
    /// Shared with `run_lock` across config updates.
    runs: Arc<Mutex<RunLog>>,
}

#[derive(Default)]
struct RunLog {
    next: u64,
    in_flight: Option<u64>,
    last_completed: Option<(u64, MonitoringReport)>,
}

/// The right to execute a job once; releases `run_lock` on drop.
struct RunTicket {
    run: u64,
    _permit: OwnedSemaphorePermit,
}

impl RunLog {
    fn begin(&mut self, permit: OwnedSemaphorePermit) -> RunTicket {
        let run = self.next;
        self.next += 1;
        self.in_flight = Some(run);
        RunTicket {
            run,
            _permit: permit,
        }
    }
}

impl JobEntry {
    fn new(id: &str, job: MonitoringJob, run_lock: Arc<Semaphore>, runs: Arc<Mutex<RunLog>>) -> Self {
        Self {
            id: id.to_string(),
            job: Arc::new(RwLock::new(job)),
            stop: CancellationToken::new(),
            run_lock,
            runs,
        }
    }

    /// Claim the run slot, or report which execution holds it. A holder
    /// that has not begun yet gets the next run number.
    async fn try_begin(&self) -> std::result::Result<RunTicket, u64> {
        let mut runs = self.runs.lock().await;
        match self.run_lock.clone().try_acquire_owned() {
            Ok(permit) => Ok(runs.begin(permit)),
            Err(_) => Err(runs.in_flight.unwrap_or(runs.next)),
        }
    }

    /// Record the end of `ticket`'s execution before its permit is released.
    async fn finish(&self, ticket: &RunTicket, report: Option<&MonitoringReport>) {
        let mut runs = self.runs.lock().await;
        if runs.in_flight == Some(ticket.run) {
            runs.in_flight = None;
        }
        if let Some(report) = report {
            runs.last_completed = Some((ticket.run, report.clone()));
        }
    }
}

/// The job registry and its timers.
pub struct Scheduler {
    runner: Runner,
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
}

impl Scheduler {
    pub fn new(monitor: Arc<Monitor>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            runner: Runner { monitor, notifier },
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a job and start its timer.
    pub async fn add_job(&self, id: &str, config: JobConfig) -> Result<MonitoringJob> {
        if id.trim().is_empty() {
            return Err(MonitorError::Config("job id is required".to_string()));
        }
        let schedule = config.validate()?;

        let mut jobs = self.jobs.write().await;
        // A job stopped by shutdown() may be registered again; its run slot
        // is reused so a cancelled execution still winding down cannot
        // overlap the new one.
        let (run_lock, runs) = match jobs.get(id) {
            Some(existing) => {
                if existing.job.read().await.is_active {
                    return Err(MonitorError::DuplicateJob(id.to_string()));
                }
                (existing.run_lock.clone(), existing.runs.clone())
            }
            None => (Arc::new(Semaphore::new(1)), Arc::default()),
        };

        let job = MonitoringJob {
            id: id.to_string(),
            config,
            is_active: true,
            last_run: None,
            last_report: None,
        };
        let entry = JobEntry::new(id, job.clone(), run_lock, runs);
        self.start_timer(&entry, schedule);
        jobs.insert(id.to_string(), entry);

        tracing::info!("Scheduler: Added job {} for {}", id, job.config.target);
        Ok(job)
    }

    /// Stop and unregister a job. Returns whether it existed.
    pub async fn remove_job(&self, id: &str) -> bool {
        let mut jobs = self.jobs.write().await;

        match jobs.remove(id) {
            Some(entry) => {
                entry.stop.cancel();
                entry.job.write().await.is_active = false;
                tracing::info!("Scheduler: Removed job {}", id);
                true
            }
            None => false,
        }
    }

    /// Replace a job's configuration and restart its timer.
    ///
    /// The swap happens under the registry lock, so readers see either the
    /// old or the new job. History (`last_run`, `last_report`) carries over.
    pub async fn update_job_config(&self, id: &str, config: JobConfig) -> Result<MonitoringJob> {
        let schedule = config.validate()?;

        let mut jobs = self.jobs.write().await;
        let old = jobs
            .get(id)
            .cloned()
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))?;

        old.stop.cancel();
        let job = {
            let mut old_job = old.job.write().await;
            old_job.is_active = false;
            MonitoringJob {
                id: id.to_string(),
                config,
                is_active: true,
                last_run: old_job.last_run,
                last_report: old_job.last_report.clone(),
            }
        };

        let entry = JobEntry::new(id, job.clone(), old.run_lock.clone(), old.runs.clone());
        self.start_timer(&entry, schedule);
        jobs.insert(id.to_string(), entry);

        tracing::info!("Scheduler: Updated job {}", id);
        Ok(job)
    }

    /// Execute a job's full cycle now, outside its cadence.
    ///
    /// If an execution is already in flight, waits for it and returns its
    /// report instead of running a second alert cycle. When that execution
    /// ends without a report (cancelled by an update), the full cycle runs
    /// with the job's current config.
    pub async fn run_job_now(&self, id: &str) -> Result<MonitoringReport> {
        loop {
            let entry = self.active_entry(id).await?;

            let waited = match entry.try_begin().await {
                Ok(ticket) => return self.runner.execute(&entry, ticket).await,
                Err(in_flight) => in_flight,
            };

            tracing::info!("Job {} already running, waiting for it", id);
            let permit = entry
                .run_lock
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| MonitorError::Cancelled)?;

            let mut runs = entry.runs.lock().await;
            if let Some((completed, report)) = &runs.last_completed {
                if *completed == waited {
                    return Ok(report.clone());
                }
            }
            let ticket = runs.begin(permit);
            drop(runs);

            // The config may have changed while waiting.
            match self.active_entry(id).await {
                Ok(current) if Arc::ptr_eq(&current.runs, &entry.runs) => {
                    return self.runner.execute(&current, ticket).await;
                }
                Ok(_) => {
                    // Removed and registered again with a fresh run slot.
                    entry.finish(&ticket, None).await;
                }
                Err(e) => {
                    entry.finish(&ticket, None).await;
                    return Err(e);
                }
            }
        }
    }

    async fn active_entry(&self, id: &str) -> Result<JobEntry> {
        let entry = self
            .jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))?;

        if !entry.job.read().await.is_active {
            return Err(MonitorError::NotFound(id.to_string()));
        }
        Ok(entry)
    }

    /// Snapshot of one job.
    pub async fn get_job(&self, id: &str) -> Option<MonitoringJob> {
        let entry = self.jobs.read().await.get(id).cloned()?;
        let job = entry.job.read().await.clone();
        Some(job)
    }

    /// Snapshots of all jobs, ordered by id.
    pub async fn list_jobs(&self) -> Vec<MonitoringJob> {
        let entries: Vec<JobEntry> = self.jobs.read().await.values().cloned().collect();

        let mut jobs = Vec::with_capacity(entries.len());
        for entry in entries {
            jobs.push(entry.job.read().await.clone());
        }
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Stop every timer and cancel in-flight executions.
    pub async fn shutdown(&self) {
        let jobs = self.jobs.read().await;
        for entry in jobs.values() {
            entry.stop.cancel();
            entry.job.write().await.is_active = false;
        }
        tracing::info!("Scheduler: Stopped {} jobs", jobs.len());
    }

    fn start_timer(&self, entry: &JobEntry, schedule: Schedule) {
        tokio::spawn(run_schedule_loop(self.runner.clone(), entry.clone(), schedule));
    }
}

/// Fire `entry` on every upcoming time of `schedule` until stopped.
async fn run_schedule_loop(runner: Runner, entry: JobEntry, schedule: Schedule) {
    let mut cursor = Utc::now();

    loop {
        let Some(next) = schedule.after(&cursor).next() else {
            tracing::info!("Schedule for job {} exhausted, timer stopped", entry.id);
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = entry.stop.cancelled() => {
                break;
            }
            _ = tokio::time::sleep(wait) => {
                spawn_scheduled_run(&runner, &entry).await;
                // Ticks missed while sleeping are skipped, not replayed.
                cursor = next.max(Utc::now());
            }
        }
    }
}

/// Start one scheduled execution unless one is already in flight.
///
/// Returns whether an execution was started.
async fn spawn_scheduled_run(runner: &Runner, entry: &JobEntry) -> bool {
    let ticket = match entry.try_begin().await {
        Ok(ticket) => ticket,
        Err(_) => {
            tracing::warn!("Skipping scheduled run for job {} due to overlap", entry.id);
            return false;
        }
    };

    let runner = runner.clone();
    let entry = entry.clone();
    tokio::spawn(async move {
        // Spread jobs that share a cron slot.
        let jitter = Duration::from_millis(rand::random::<u64>() % MAX_JITTER_MS);

        if let Err(e) = runner.execute_after(&entry, ticket, jitter).await {
            tracing::debug!("Scheduled run for job {} ended early: {}", entry.id, e);
        }
    });
    true
}

impl Runner {
    async fn execute(&self, entry: &JobEntry, ticket: RunTicket) -> Result<MonitoringReport> {
        self.execute_after(entry, ticket, Duration::ZERO).await
    }

    /// Wait `delay`, then probe, record, evaluate and notify. Holds the run
    /// slot throughout; stopping the job ends the wait early.
    async fn execute_after(
        &self,
        entry: &JobEntry,
        ticket: RunTicket,
        delay: Duration,
    ) -> Result<MonitoringReport> {
        let result = self.run_cycle(entry, delay).await;
        entry.finish(&ticket, result.as_ref().ok()).await;
        result
    }

    async fn run_cycle(&self, entry: &JobEntry, delay: Duration) -> Result<MonitoringReport> {
        if !delay.is_zero() {
            tokio::select! {
                _ = entry.stop.cancelled() => return Err(MonitorError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let (id, config) = {
            let job = entry.job.read().await;
            (job.id.clone(), job.config.clone())
        };

        let report = self
            .monitor
            .run_cancellable(&config.target, config.keyword.as_deref(), &entry.stop)
            .await?;

        {
            let mut job = entry.job.write().await;
            job.last_run = Some(report.observed_at);
            job.last_report = Some(report.clone());
        }

        let alerts = evaluate(&report, config.alert_thresholds.as_ref());
        if alerts.is_empty() {
            return Ok(report);
        }
        tracing::info!("Job {} raised {} alerts", id, alerts.len());

        if let Some(channel) = &config.notification {
            let notification = AlertNotification::new(&id, &report, &alerts);
            if let Err(e) = self
                .notifier
                .send(&channel.recipients, &notification.subject, &notification.body)
                .await
            {
                tracing::error!("Failed to send alert notification for job {}: {}", id, e);
            }
        }

        Ok(report)
    }
}
