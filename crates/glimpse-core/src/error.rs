// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the Glimpse workspace.

use thiserror::Error;

/// The primary error type used across the ledger, pipeline, and adapters.
#[derive(Debug, Error)]
pub enum GlimpseError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger I/O errors (database connection, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Content fetch errors for a single tracked account (network, auth expiry,
    /// unexpected payload shape). Isolated per account: one failing handle never
    /// aborts the cycle for the others.
    #[error("fetch error for @{handle}: {message}")]
    Fetch {
        handle: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A story with this remote id is already persisted. Raised by the batch
    /// insert when a concurrent check won the race; callers treat the item as
    /// already handled and suppress its delivery.
    #[error("story {remote_id} is already persisted")]
    DuplicateItem { remote_id: i64 },

    /// Delivery failure for a single recipient. Logged, never retried within
    /// the cycle, and never blocks other recipients.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GlimpseError {
    /// Shorthand for a fetch error without an underlying source.
    pub fn fetch(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            handle: handle.into(),
            message: message.into(),
            source: None,
        }
    }
}
