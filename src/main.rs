//! pulsecheck - website health monitoring CLI.

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, Command};
use pulsecheck::alerts::{LogNotifier, Notifier, WebhookNotifier};
use pulsecheck::config::{load_job_definitions, AppConfig};
use pulsecheck::{ErrorBody, Monitor, MonitorError, ProbeBackends, Scheduler};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "pulsecheck=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args = Args::parse();
    let cfg = AppConfig::load();

    let result = match args.command {
        Command::Check { url, keyword } => check(&cfg, &url, keyword.as_deref()).await,
        Command::Watch => watch(&cfg).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let body = ErrorBody::from(&e);
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Ad-hoc run; Ctrl-C cancels in-flight probes.
async fn check(cfg: &AppConfig, url: &str, keyword: Option<&str>) -> pulsecheck::Result<()> {
    let monitor = Monitor::new(ProbeBackends::system(cfg)?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = monitor.run_cancellable(url, keyword, &cancel).await?;
    let json = serde_json::to_string_pretty(&report).map_err(|e| MonitorError::Parse {
        message: "failed to serialize report".to_string(),
        raw: e.to_string(),
    })?;
    println!("{}", json);

    Ok(())
}

/// Run the jobs file's jobs until Ctrl-C.
async fn watch(cfg: &AppConfig) -> pulsecheck::Result<()> {
    let path = cfg
        .jobs_file
        .as_ref()
        .ok_or_else(|| MonitorError::Config("PULSECHECK_JOBS_FILE is not set".to_string()))?;
    let definitions = load_job_definitions(path)?;

    let monitor = Arc::new(Monitor::new(ProbeBackends::system(cfg)?));
    let notifier: Arc<dyn Notifier> = match &cfg.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.as_str())?),
        None => Arc::new(LogNotifier),
    };
    let scheduler = Scheduler::new(monitor, notifier);

    tracing::info!("Starting scheduler with {} jobs", definitions.len());
    for def in definitions {
        if let Err(e) = scheduler.add_job(&def.id, def.config).await {
            tracing::error!("Failed to register job {}: {}", def.id, e);
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    scheduler.shutdown().await;

    Ok(())
}
