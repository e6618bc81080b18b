// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracked source account operations.

use glimpse_core::{GlimpseError, SourceAccount};
use rusqlite::params;

use crate::database::Database;

/// Idempotent create-if-absent for a tracked account handle.
///
/// Called once per configured handle at startup; re-running never creates a
/// duplicate row for an already-known handle.
pub async fn ensure_account(db: &Database, handle: &str) -> Result<SourceAccount, GlimpseError> {
    let handle = handle.to_string();
    let now = now_utc();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO accounts (handle, created_at) VALUES (?1, ?2)",
                params![handle, now],
            )?;
            conn.query_row(
                "SELECT id, handle, created_at FROM accounts WHERE handle = ?1",
                params![handle],
                |row| {
                    Ok(SourceAccount {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all tracked accounts in handle order.
pub async fn list_accounts(db: &Database) -> Result<Vec<SourceAccount>, GlimpseError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, handle, created_at FROM accounts ORDER BY handle")?;
            let rows = stmt.query_map([], |row| {
                Ok(SourceAccount {
                    id: row.get(0)?,
                    handle: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?;
            let mut accounts = Vec::new();
            for row in rows {
                accounts.push(row?);
            }
            Ok(accounts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) fn now_utc() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn ensure_account_is_idempotent() {
        let (db, _dir) = setup_db().await;

        let first = ensure_account(&db, "alice").await.unwrap();
        let second = ensure_account(&db, "alice").await.unwrap();
        assert_eq!(first.id, second.id);

        let all = list_accounts(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].handle, "alice");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_accounts_orders_by_handle() {
        let (db, _dir) = setup_db().await;
        ensure_account(&db, "bob").await.unwrap();
        ensure_account(&db, "alice").await.unwrap();

        let all = list_accounts(&db).await.unwrap();
        let handles: Vec<&str> = all.iter().map(|a| a.handle.as_str()).collect();
        assert_eq!(handles, vec!["alice", "bob"]);
        db.close().await.unwrap();
    }
}
