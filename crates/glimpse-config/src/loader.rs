// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./glimpse.toml` > `~/.config/glimpse/glimpse.toml`
//! > `/etc/glimpse/glimpse.toml`, with environment variable overrides via the
//! `GLIMPSE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::GlimpseConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/glimpse/glimpse.toml` (system-wide)
/// 3. `~/.config/glimpse/glimpse.toml` (user XDG config)
/// 4. `./glimpse.toml` (local directory)
/// 5. `GLIMPSE_*` environment variables
pub fn load_config() -> Result<GlimpseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GlimpseConfig::default()))
        .merge(Toml::file("/etc/glimpse/glimpse.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("glimpse/glimpse.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("glimpse.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GlimpseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GlimpseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GlimpseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GlimpseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `GLIMPSE_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("GLIMPSE_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("app_", "app.", 1)
            .replacen("instagram_", "instagram.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("poll_", "poll.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
