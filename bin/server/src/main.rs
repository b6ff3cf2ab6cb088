//! The telepost control surface.
//!
//! A small HTTP API for operating the scheduler daemon: start and stop
//! it, inspect its status and logs, run its connection checks, and
//! preview the posts due for publication.

mod config;
mod control;
mod routes;

use config::ServerConfig;
use control::DaemonControl;
use routes::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use telepost_notion::NotionClient;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let notion = match NotionClient::new(
        &config.notion.token,
        &config.notion.data_source_id,
        &config.notion.type_field,
    ) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "could not build task-store client");
            return ExitCode::FAILURE;
        }
    };

    let control = DaemonControl::new(
        &config.scheduler.lock_file,
        &config.scheduler.log_file,
        &config.scheduler.daemon_bin,
    );
    let state = Arc::new(AppState { notion, control });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, %addr, "could not bind the control surface");
            return ExitCode::FAILURE;
        }
    };
    info!(%addr, "control surface listening");

    if let Err(err) = axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "control surface failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
