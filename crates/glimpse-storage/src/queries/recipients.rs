// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscribed recipient operations.

use glimpse_core::{GlimpseError, RecipientRecord};
use rusqlite::params;

use crate::database::Database;
use crate::queries::accounts::now_utc;

/// Idempotent subscribe. Returns the recipient row and whether it was
/// created by this call (`false` means the chat was already subscribed).
///
/// The INSERT OR IGNORE plus the UNIQUE constraint on chat_id make this safe
/// under concurrent invocation: exactly one row per chat, ever.
pub async fn ensure_recipient(
    db: &Database,
    chat_id: i64,
) -> Result<(RecipientRecord, bool), GlimpseError> {
    let now = now_utc();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO recipients (chat_id, created_at) VALUES (?1, ?2)",
                params![chat_id, now],
            )?;
            let recipient = conn.query_row(
                "SELECT id, chat_id, created_at FROM recipients WHERE chat_id = ?1",
                params![chat_id],
                map_recipient_row,
            )?;
            Ok((recipient, inserted > 0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether the chat is subscribed.
pub async fn is_recipient(db: &Database, chat_id: i64) -> Result<bool, GlimpseError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM recipients WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All subscribed recipients. Order is irrelevant; used for fan-out.
pub async fn all_recipients(db: &Database) -> Result<Vec<RecipientRecord>, GlimpseError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, chat_id, created_at FROM recipients")?;
            let rows = stmt.query_map([], map_recipient_row)?;
            let mut recipients = Vec::new();
            for row in rows {
                recipients.push(row?);
            }
            Ok(recipients)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_recipient_row(row: &rusqlite::Row<'_>) -> Result<RecipientRecord, rusqlite::Error> {
    Ok(RecipientRecord {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}
