// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite ledger for the Glimpse story relay bot.
//!
//! Durable record of tracked accounts, seen stories, and subscribed
//! recipients. WAL-mode SQLite with embedded migrations and a single-writer
//! concurrency model via `tokio-rusqlite`. The UNIQUE constraint on story
//! remote ids is the deduplication mechanism the whole pipeline leans on.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
