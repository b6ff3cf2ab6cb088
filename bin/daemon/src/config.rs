//! Centralized daemon configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables, e.g. `NOTION__TOKEN`, `TELEGRAM__BOT_TOKEN`,
//! `SCHEDULER__INTERVAL_MINUTES`.

use serde::Deserialize;
use std::path::PathBuf;

/// Daemon configuration composed from per-service sections.
#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    /// Task-store access.
    pub notion: NotionConfig,

    /// Messaging-provider access.
    pub telegram: TelegramConfig,

    /// Loop and lock settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
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

/// Telegram bot access configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token.
    pub bot_token: String,

    /// Default destination channel (`@name` or a numeric chat id).
    pub channel: String,
}

/// Scheduler loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between check-and-publish cycles.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Path of the single-instance lock file.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Path of the daemon log file, also read by the control surface.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_type_field() -> String {
    "Tipo".to_string()
}

fn default_interval_minutes() -> u64 {
    15
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(".scheduler.lock")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("scheduler.log")
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            lock_file: default_lock_file(),
            log_file: default_log_file(),
        }
    }
}

impl DaemonConfig {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_has_correct_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval_minutes, 15);
        assert_eq!(config.lock_file, PathBuf::from(".scheduler.lock"));
        assert_eq!(config.log_file, PathBuf::from("scheduler.log"));
    }

    #[test]
    fn type_field_defaults_to_editorial_schema() {
        assert_eq!(default_type_field(), "Tipo");
    }
}
