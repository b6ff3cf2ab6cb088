//! Control-surface configuration.
//!
//! Loaded from environment variables with the same keys the daemon uses
//! for the shared lock and log paths, plus `SERVER__HOST`, `SERVER__PORT`
//! and `SCHEDULER__DAEMON_BIN` for the surface itself.

use serde::Deserialize;
use std::path::PathBuf;

/// Control-surface configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default)]
    pub server: HttpConfig,

    /// Task-store access, used by the upcoming-posts endpoint.
    pub notion: NotionConfig,

    /// Paths shared with the daemon, plus the daemon binary to launch.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Notion data-source access configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionConfig {
    /// Integration token.
    pub token: String,

    /// Data source holding the editorial calendar.
    pub data_source_id: String,

    /// Name of the type property in the editorial schema.
    #[serde(default = "default_type_field")]
    pub type_field: String,
}

/// Daemon coordination settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Lock file the daemon owns while running.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Daemon log file scanned for cycle markers and tailed on request.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Daemon executable launched by the start action.
    #[serde(default = "default_daemon_bin")]
    pub daemon_bin: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_type_field() -> String {
    "Tipo".to_string()
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(".scheduler.lock")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("scheduler.log")
}

fn default_daemon_bin() -> PathBuf {
    PathBuf::from("telepost-daemon")
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            log_file: default_log_file(),
            daemon_bin: default_daemon_bin(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
