// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seen-story operations: the deduplication core of the ledger.

use std::collections::HashSet;
use std::str::FromStr;

use glimpse_core::{GlimpseError, MediaKind, NewStory, StoryRecord};
use rusqlite::params;

use crate::database::Database;
use crate::queries::accounts::now_utc;

/// Returns the remote id of every persisted story.
///
/// This is the read side of the diff: reflects all prior successful
/// [`insert_batch`] calls (read-your-writes through the single connection).
pub async fn known_remote_ids(db: &Database) -> Result<HashSet<i64>, GlimpseError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT remote_id FROM stories")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            let mut ids = HashSet::new();
            for row in rows {
                ids.insert(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert all given stories for one account as a single atomic batch.
///
/// Returns the stored rows. If any remote id already exists the whole batch
/// rolls back and the call fails with [`GlimpseError::DuplicateItem`];
/// callers pre-filter via [`known_remote_ids`], so hitting this path means a
/// concurrent check won the race and the items are already handled.
pub async fn insert_batch(
    db: &Database,
    account_id: i64,
    stories: Vec<NewStory>,
) -> Result<Vec<StoryRecord>, GlimpseError> {
    if stories.is_empty() {
        return Ok(Vec::new());
    }

    let now = now_utc();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut stored = Vec::with_capacity(stories.len());
            for story in &stories {
                let taken_at = story
                    .taken_at
                    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    .to_string();
                let insert = tx.execute(
                    "INSERT INTO stories
                         (remote_id, account_id, taken_at, kind, media_path, video_duration, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        story.remote_id,
                        account_id,
                        taken_at,
                        story.kind.to_string(),
                        story.media_path,
                        story.video_duration,
                        now,
                    ],
                );
                match insert {
                    Ok(_) => stored.push(StoryRecord {
                        id: tx.last_insert_rowid(),
                        remote_id: story.remote_id,
                        account_id,
                        taken_at,
                        kind: story.kind,
                        media_path: story.media_path.clone(),
                        video_duration: story.video_duration,
                        created_at: now.clone(),
                    }),
                    // Only the remote_id uniqueness failure means "already
                    // persisted"; other constraint violations (foreign key,
                    // media_path collision) are real storage errors and must
                    // not be swallowed as duplicates.
                    Err(rusqlite::Error::SqliteFailure(e, ref msg))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation
                            && msg
                                .as_deref()
                                .is_some_and(|m| m.contains("stories.remote_id")) =>
                    {
                        // Dropping the transaction rolls back the whole batch.
                        return Ok(Err(story.remote_id));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            tx.commit()?;
            Ok(Ok(stored))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        Ok(stored) => Ok(stored),
        Err(remote_id) => Err(GlimpseError::DuplicateItem { remote_id }),
    }
}

/// All persisted stories for one account handle, oldest first.
///
/// Used by the subscribe backfill and the /all command.
pub async fn stories_for_account(
    db: &Database,
    handle: &str,
) -> Result<Vec<StoryRecord>, GlimpseError> {
    let handle = handle.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.remote_id, s.account_id, s.taken_at, s.kind,
                        s.media_path, s.video_duration, s.created_at
                 FROM stories s JOIN accounts a ON a.id = s.account_id
                 WHERE a.handle = ?1
                 ORDER BY s.taken_at ASC",
            )?;
            let rows = stmt.query_map(params![handle], map_story_row)?;
            let mut stories = Vec::new();
            for row in rows {
                stories.push(row?);
            }
            Ok(stories)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_story_row(row: &rusqlite::Row<'_>) -> Result<StoryRecord, rusqlite::Error> {
    let kind_str: String = row.get(4)?;
    let kind = MediaKind::from_str(&kind_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoryRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        account_id: row.get(2)?,
        taken_at: row.get(3)?,
        kind,
        media_path: row.get(5)?,
        video_duration: row.get(6)?,
        created_at: row.get(7)?,
    })
}
