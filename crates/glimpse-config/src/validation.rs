// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates the semantic constraints serde attributes cannot express, such
//! as minimum polling intervals and well-formed tracked-account lists.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::GlimpseConfig;

/// Minimum allowed polling interval. Anything shorter hammers the source
/// API and gets the session flagged.
const MIN_INTERVAL_SECS: u64 = 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GlimpseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.media_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.media_dir must not be empty".to_string(),
        });
    }

    if config.poll.interval_secs < MIN_INTERVAL_SECS {
        errors.push(ConfigError::Validation {
            message: format!(
                "poll.interval_secs must be at least {MIN_INTERVAL_SECS}, got {}",
                config.poll.interval_secs
            ),
        });
    }

    let mut seen_handles = HashSet::new();
    for (i, handle) in config.instagram.accounts.iter().enumerate() {
        if handle.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("instagram.accounts[{i}] must not be empty"),
            });
        } else if !seen_handles.insert(handle) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate handle `{handle}` in instagram.accounts"
                ),
            });
        }
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    if let Some(password) = &config.telegram.password
        && password.is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.password must not be empty when set".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
