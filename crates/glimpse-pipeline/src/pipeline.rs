// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The diff-and-deliver pipeline: one fetch-diff-persist-fanout pass.
//!
//! The pipeline detects and persists new stories but never sends; it returns
//! [`DeliveryTask`]s for the caller (poll loop or a command handler) to push
//! through a [`DeliveryChannel`]. That split lets the periodic loop and the
//! on-demand /check command share the same detection logic, and lets tests
//! assert persisted state and task lists without a live transport.

use std::path::PathBuf;
use std::sync::Arc;

use glimpse_core::{ContentFetcher, DeliveryTask, FetchedStory, GlimpseError, NewStory, StoryRecord};
use glimpse_storage::Database;
use glimpse_storage::queries::{accounts, recipients, stories};
use metrics::counter;
use tracing::{debug, info, warn};

/// Runs check cycles over the tracked accounts.
///
/// Holds the one shared [`Database`], so periodic and command-triggered
/// checks diff against the same ledger state and can never double-persist.
pub struct Pipeline {
    fetcher: Arc<dyn ContentFetcher>,
    db: Database,
    handles: Vec<String>,
    media_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        db: Database,
        handles: Vec<String>,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            db,
            handles,
            media_dir,
        }
    }

    /// Access to the shared ledger, for command handlers.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The tracked account handles, in configuration order.
    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    /// One full check cycle across all tracked accounts.
    ///
    /// Fetches every account concurrently, diffs against the ledger,
    /// persists the unseen stories one atomic batch per account, and returns
    /// one delivery task per (recipient, account-with-new-stories) pair.
    /// A failing account contributes zero stories and never aborts the rest.
    pub async fn run_cycle(&self) -> Result<Vec<DeliveryTask>, GlimpseError> {
        counter!("glimpse_cycles_total").increment(1);
        if self.handles.is_empty() {
            return Ok(Vec::new());
        }

        debug!(accounts = ?self.handles, "checking for new stories");

        let fetches = self
            .handles
            .iter()
            .map(|handle| async move {
                (handle.clone(), self.fetcher.fetch_stories(handle).await)
            });
        let results = futures::future::join_all(fetches).await;

        let mut tasks = Vec::new();
        let subscribers = recipients::all_recipients(&self.db).await?;

        for (handle, result) in results {
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(e) => {
                    counter!("glimpse_fetch_failures_total").increment(1);
                    warn!(handle, error = %e, "fetch failed, skipping account this cycle");
                    continue;
                }
            };

            match self.detect_and_persist(&handle, fetched).await {
                Ok(stored) if !stored.is_empty() => {
                    info!(handle, count = stored.len(), "new stories persisted");
                    counter!("glimpse_new_stories_total").increment(stored.len() as u64);
                    for recipient in &subscribers {
                        tasks.push(DeliveryTask {
                            chat_id: recipient.chat_id,
                            handle: handle.clone(),
                            stories: stored.clone(),
                        });
                    }
                }
                Ok(_) => debug!(handle, "no new stories"),
                Err(e) => {
                    counter!("glimpse_persist_failures_total").increment(1);
                    warn!(handle, error = %e, "persist failed, skipping account this cycle");
                }
            }
        }

        Ok(tasks)
    }

    /// Single-account check used by the /check callback.
    ///
    /// Same detection logic as [`run_cycle`](Self::run_cycle), but fetch
    /// errors propagate so the command handler can report them.
    pub async fn check_account(&self, handle: &str) -> Result<Vec<DeliveryTask>, GlimpseError> {
        let fetched = self.fetcher.fetch_stories(handle).await?;
        let stored = self.detect_and_persist(handle, fetched).await?;
        if stored.is_empty() {
            return Ok(Vec::new());
        }
        counter!("glimpse_new_stories_total").increment(stored.len() as u64);

        let subscribers = recipients::all_recipients(&self.db).await?;
        Ok(subscribers
            .iter()
            .map(|recipient| DeliveryTask {
                chat_id: recipient.chat_id,
                handle: handle.to_string(),
                stories: stored.clone(),
            })
            .collect())
    }

    /// Every persisted story for one account, oldest first. Used for the
    /// subscribe backfill and the /all command.
    pub async fn backlog(&self, handle: &str) -> Result<Vec<StoryRecord>, GlimpseError> {
        stories::stories_for_account(&self.db, handle).await
    }

    /// Diff fetched stories against the ledger, download media for the
    /// unseen ones, and persist them as one atomic batch.
    ///
    /// Persisting happens before any delivery task is constructed, so a
    /// crash after this point at worst loses a notification, never creates
    /// a duplicate record.
    async fn detect_and_persist(
        &self,
        handle: &str,
        fetched: Vec<FetchedStory>,
    ) -> Result<Vec<StoryRecord>, GlimpseError> {
        let total = fetched.len();
        let known = stories::known_remote_ids(&self.db).await?;
        let unseen: Vec<FetchedStory> = fetched
            .into_iter()
            .filter(|s| !known.contains(&s.remote_id))
            .collect();

        debug!(handle, total, new = unseen.len(), "diffed fetched stories");
        if unseen.is_empty() {
            return Ok(Vec::new());
        }

        let account = accounts::ensure_account(&self.db, handle).await?;
        let dest_dir = self.media_dir.join(handle);

        let mut rows = Vec::with_capacity(unseen.len());
        for story in &unseen {
            let media_path = match self.fetcher.download(handle, story, &dest_dir).await {
                Ok(path) => Some(path.display().to_string()),
                Err(e) => {
                    // Persist anyway so the story is never re-fetched; it is
                    // skipped at send time.
                    warn!(handle, remote_id = story.remote_id, error = %e, "media download failed");
                    None
                }
            };
            rows.push(NewStory::from_fetched(story, media_path));
        }

        match stories::insert_batch(&self.db, account.id, rows.clone()).await {
            Ok(stored) => Ok(stored),
            Err(GlimpseError::DuplicateItem { remote_id }) => {
                // A concurrent check persisted part of this batch between our
                // diff and the insert. Re-read, drop what the winner stored,
                // and retry the remainder once.
                debug!(handle, remote_id, "lost persist race, retrying remainder");
                let known = stories::known_remote_ids(&self.db).await?;
                let remainder: Vec<NewStory> = rows
                    .into_iter()
                    .filter(|r| !known.contains(&r.remote_id))
                    .collect();
                if remainder.is_empty() {
                    return Ok(Vec::new());
                }
                match stories::insert_batch(&self.db, account.id, remainder).await {
                    Ok(stored) => Ok(stored),
                    Err(GlimpseError::DuplicateItem { remote_id }) => {
                        warn!(handle, remote_id, "lost persist race twice, treating as handled");
                        Ok(Vec::new())
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}
