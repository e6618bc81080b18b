// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup with an actionable diagnostic.

use serde::{Deserialize, Serialize};

/// Top-level Glimpse configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections default to sensible values; only the
/// credential fields have no usable default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlimpseConfig {
    /// Process-level settings (name, logging).
    #[serde(default)]
    pub app: AppConfig,

    /// Instagram session and tracked-account settings.
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Polling cadence settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Ledger and media storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in log output.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path of the plain-text log file served by the /log command.
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_path: default_log_path(),
        }
    }
}

fn default_app_name() -> String {
    "glimpse".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_path() -> String {
    data_dir_file("glimpse.log")
}

/// Instagram session configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstagramConfig {
    /// Login username. `None` means the fetcher cannot authenticate.
    #[serde(default)]
    pub username: Option<String>,

    /// Login password.
    #[serde(default)]
    pub password: Option<String>,

    /// Handles of the accounts whose stories are tracked.
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Shared secret gating the /subscribe flow.
    #[serde(default)]
    pub password: Option<String>,
}

/// Polling cadence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Seconds between story check cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    1800
}

/// Ledger and media storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory where downloaded story media is kept.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    /// Soft cap on the media directory size before the bot starts warning.
    #[serde(default = "default_temp_limit_mb")]
    pub temp_limit_mb: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_dir: default_media_dir(),
            temp_limit_mb: default_temp_limit_mb(),
        }
    }
}

fn default_database_path() -> String {
    data_dir_file("glimpse.db")
}

fn default_media_dir() -> String {
    data_dir_file("media")
}

fn default_temp_limit_mb() -> u64 {
    256
}

fn data_dir_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("glimpse").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GlimpseConfig::default();
        assert_eq!(config.app.name, "glimpse");
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.poll.interval_secs, 1800);
        assert_eq!(config.storage.temp_limit_mb, 256);
        assert!(config.instagram.accounts.is_empty());
        assert!(config.telegram.bot_token.is_none());
    }
}
