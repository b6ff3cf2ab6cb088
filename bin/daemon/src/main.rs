//! The telepost scheduler daemon.
//!
//! Loads configuration, takes the single-instance lock, verifies both
//! remote connections, and drives the check-and-publish loop until a
//! shutdown signal arrives. With `--check` it only runs the connection
//! checks and exits, which the control surface uses as its test command.

mod config;

use config::DaemonConfig;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use telepost_notion::NotionClient;
use telepost_scheduler::{InstanceLock, PublishCycle, ScheduleLoop};
use telepost_telegram::TelegramClient;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let check_only = std::env::args().any(|arg| arg == "--check");

    // Configuration errors are fatal before anything else happens; the
    // lock in particular must never be touched by a misconfigured start.
    let config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_tracing(&config.scheduler.log_file) {
        eprintln!(
            "could not open log file {}: {err}",
            config.scheduler.log_file.display()
        );
        return ExitCode::FAILURE;
    }
    tracing::info!("Loaded configuration");

    let notion = match NotionClient::new(
        &config.notion.token,
        &config.notion.data_source_id,
        &config.notion.type_field,
    ) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "could not build task-store client");
            return ExitCode::FAILURE;
        }
    };

    let telegram = match TelegramClient::new(&config.telegram.bot_token, &config.telegram.channel)
    {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "could not build messaging client");
            return ExitCode::FAILURE;
        }
    };

    if check_only {
        return if check_connections(&notion, &telegram).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let mut lock = InstanceLock::new(&config.scheduler.lock_file);
    if let Err(err) = lock.acquire() {
        tracing::error!(error = %err, "refusing to start");
        return ExitCode::FAILURE;
    }

    if !check_connections(&notion, &telegram).await {
        tracing::error!("connection checks failed, exiting");
        lock.release();
        return ExitCode::FAILURE;
    }

    let cycle = PublishCycle::new(Arc::new(notion), Arc::new(telegram));
    let interval = Duration::from_secs(config.scheduler.interval_minutes * 60);
    let schedule = ScheduleLoop::new(cycle, interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    schedule.run(shutdown_rx).await;

    lock.release();
    tracing::info!("scheduler stopped");
    ExitCode::SUCCESS
}

/// Logs to stdout and to the daemon log file the control surface tails.
fn init_tracing(log_file: &Path) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}

/// Tests both remote connections; both must pass.
async fn check_connections(notion: &NotionClient, telegram: &TelegramClient) -> bool {
    let notion_ok = match notion.check_connection().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "task store connection failed");
            false
        }
    };

    let telegram_ok = match telegram.check_connection().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "messaging provider connection failed");
            false
        }
    };

    if notion_ok && telegram_ok {
        tracing::info!("all connections ok");
        true
    } else {
        tracing::error!("some connections failed, check credentials");
        false
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not listen for sigterm");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
