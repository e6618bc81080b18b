// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests over a real temp-file ledger with fake
//! fetcher and channel collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use glimpse_core::{
    ContentFetcher, DeliveryChannel, FetchedStory, GlimpseError, MediaKind, NewStory, StoryRecord,
};
use glimpse_pipeline::{Pipeline, deliver_all};
use glimpse_storage::Database;
use glimpse_storage::queries::{accounts, recipients, stories};
use tokio::sync::Mutex;

/// Serves canned story lists per handle; `Err` entries simulate fetch
/// failures. Downloads write a marker file into the destination directory.
struct FakeFetcher {
    responses: HashMap<String, Result<Vec<FetchedStory>, String>>,
    fail_downloads: bool,
}

impl FakeFetcher {
    fn new(responses: HashMap<String, Result<Vec<FetchedStory>, String>>) -> Self {
        Self {
            responses,
            fail_downloads: false,
        }
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch_stories(&self, handle: &str) -> Result<Vec<FetchedStory>, GlimpseError> {
        match self.responses.get(handle) {
            Some(Ok(stories)) => Ok(stories.clone()),
            Some(Err(msg)) => Err(GlimpseError::fetch(handle, msg.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn download(
        &self,
        handle: &str,
        story: &FetchedStory,
        dest_dir: &Path,
    ) -> Result<PathBuf, GlimpseError> {
        if self.fail_downloads {
            return Err(GlimpseError::fetch(handle, "download refused"));
        }
        std::fs::create_dir_all(dest_dir).unwrap();
        let path = dest_dir.join(format!("{}.bin", story.remote_id));
        std::fs::write(&path, b"media").unwrap();
        Ok(path)
    }
}

/// Records every send; optionally fails for one chat id.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(i64, String, Vec<i64>)>>,
    fail_for_chat: Option<i64>,
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send_group(
        &self,
        chat_id: i64,
        handle: &str,
        stories: &[StoryRecord],
    ) -> Result<(), GlimpseError> {
        if self.fail_for_chat == Some(chat_id) {
            return Err(GlimpseError::Delivery {
                message: format!("chat {chat_id} unreachable"),
                source: None,
            });
        }
        let ids = stories.iter().map(|s| s.remote_id).collect();
        self.sent.lock().await.push((chat_id, handle.to_string(), ids));
        Ok(())
    }
}

/// Persists each story itself during `download`, so by the time the
/// pipeline's own batch insert runs, a "concurrent" check has already won
/// the race for every story in the batch.
struct RacingFetcher {
    db: Database,
    stories: Vec<FetchedStory>,
}

#[async_trait]
impl ContentFetcher for RacingFetcher {
    async fn fetch_stories(&self, _handle: &str) -> Result<Vec<FetchedStory>, GlimpseError> {
        Ok(self.stories.clone())
    }

    async fn download(
        &self,
        handle: &str,
        story: &FetchedStory,
        dest_dir: &Path,
    ) -> Result<PathBuf, GlimpseError> {
        let account = accounts::ensure_account(&self.db, handle).await?;
        let winner_path = format!("/tmp/winner-{}.bin", story.remote_id);
        stories::insert_batch(
            &self.db,
            account.id,
            vec![NewStory::from_fetched(story, Some(winner_path))],
        )
        .await?;
        Ok(dest_dir.join(format!("{}.bin", story.remote_id)))
    }
}

fn story(remote_id: i64, kind: MediaKind) -> FetchedStory {
    FetchedStory {
        remote_id,
        taken_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        kind,
        video_duration: match kind {
            MediaKind::Video => Some(7.2),
            MediaKind::Image => None,
        },
        media_url: format!("https://cdn.example/{remote_id}"),
    }
}

async fn setup(
    responses: HashMap<String, Result<Vec<FetchedStory>, String>>,
    handles: &[&str],
) -> (Arc<Pipeline>, Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db").to_str().unwrap())
        .await
        .unwrap();
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(FakeFetcher::new(responses)),
        db.clone(),
        handles.iter().map(|h| h.to_string()).collect(),
        dir.path().join("media"),
    ));
    (pipeline, db, dir)
}

#[tokio::test]
async fn cycle_persists_and_fans_out_then_is_idempotent() {
    // Ledger empty, alice has two stories, bob none, one recipient.
    let responses = HashMap::from([
        (
            "alice".to_string(),
            Ok(vec![story(1, MediaKind::Image), story(2, MediaKind::Video)]),
        ),
        ("bob".to_string(), Ok(vec![])),
    ]);
    let (pipeline, db, _dir) = setup(responses, &["alice", "bob"]).await;
    recipients::ensure_recipient(&db, 42).await.unwrap();

    let tasks = pipeline.run_cycle().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].chat_id, 42);
    assert_eq!(tasks[0].handle, "alice");
    let ids: Vec<i64> = tasks[0].stories.iter().map(|s| s.remote_id).collect();
    assert_eq!(ids, vec![1, 2]);

    let persisted = stories::stories_for_account(&db, "alice").await.unwrap();
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().all(|s| s.media_path.is_some()));

    // Same fetch results again: unseen set is empty, nothing persisted,
    // nothing to deliver.
    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());
    let persisted = stories::stories_for_account(&db, "alice").await.unwrap();
    assert_eq!(persisted.len(), 2);
}

#[tokio::test]
async fn cycle_with_zero_recipients_persists_but_produces_no_tasks() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(10, MediaKind::Image)]),
    )]);
    let (pipeline, db, _dir) = setup(responses, &["alice"]).await;

    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());

    // The story is recorded, so a later subscriber does not trigger a
    // duplicate delivery of it as "new".
    assert_eq!(
        stories::known_remote_ids(&db).await.unwrap(),
        std::collections::HashSet::from([10])
    );
}

#[tokio::test]
async fn one_failing_account_does_not_abort_the_other() {
    let responses = HashMap::from([
        ("alice".to_string(), Err("login expired".to_string())),
        ("bob".to_string(), Ok(vec![story(20, MediaKind::Video)])),
    ]);
    let (pipeline, db, _dir) = setup(responses, &["alice", "bob"]).await;
    recipients::ensure_recipient(&db, 7).await.unwrap();

    let tasks = pipeline.run_cycle().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].handle, "bob");
    assert_eq!(stories::stories_for_account(&db, "bob").await.unwrap().len(), 1);
    assert!(stories::stories_for_account(&db, "alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn one_new_story_two_recipients_two_tasks() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(30, MediaKind::Image)]),
    )]);
    let (pipeline, db, _dir) = setup(responses, &["alice"]).await;
    recipients::ensure_recipient(&db, 1).await.unwrap();
    recipients::ensure_recipient(&db, 2).await.unwrap();

    let tasks = pipeline.run_cycle().await.unwrap();
    assert_eq!(tasks.len(), 2);
    let mut chats: Vec<i64> = tasks.iter().map(|t| t.chat_id).collect();
    chats.sort_unstable();
    assert_eq!(chats, vec![1, 2]);
    for task in &tasks {
        assert_eq!(task.stories.len(), 1);
        assert_eq!(task.stories[0].remote_id, 30);
    }
}

#[tokio::test]
async fn zero_tracked_accounts_is_a_no_op() {
    let (pipeline, db, _dir) = setup(HashMap::new(), &[]).await;
    recipients::ensure_recipient(&db, 1).await.unwrap();
    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn failed_download_persists_story_without_media_path() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(40, MediaKind::Image)]),
    )]);
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db").to_str().unwrap())
        .await
        .unwrap();
    let mut fetcher = FakeFetcher::new(responses);
    fetcher.fail_downloads = true;
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        db.clone(),
        vec!["alice".to_string()],
        dir.path().join("media"),
    );

    pipeline.run_cycle().await.unwrap();
    let persisted = stories::stories_for_account(&db, "alice").await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert!(persisted[0].media_path.is_none());

    // Not re-detected as new next cycle despite the missing media.
    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn race_loser_suppresses_delivery_of_already_persisted_story() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("test.db").to_str().unwrap())
        .await
        .unwrap();
    recipients::ensure_recipient(&db, 42).await.unwrap();

    let fetcher = RacingFetcher {
        db: db.clone(),
        stories: vec![story(80, MediaKind::Image)],
    };
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        db.clone(),
        vec!["alice".to_string()],
        dir.path().join("media"),
    );

    // The diff sees the story as unseen, but the "concurrent" winner
    // persists it before the pipeline's batch insert. The loser must treat
    // it as handled: no task, no second row.
    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());

    let persisted = stories::stories_for_account(&db, "alice").await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].remote_id, 80);
    assert_eq!(persisted[0].media_path.as_deref(), Some("/tmp/winner-80.bin"));
}

#[tokio::test]
async fn check_account_shares_the_ledger_with_cycles() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(50, MediaKind::Image)]),
    )]);
    let (pipeline, db, _dir) = setup(responses, &["alice"]).await;
    recipients::ensure_recipient(&db, 9).await.unwrap();

    // Manual check first: it persists the story.
    let tasks = pipeline.check_account("alice").await.unwrap();
    assert_eq!(tasks.len(), 1);

    // The periodic cycle then sees nothing new.
    let tasks = pipeline.run_cycle().await.unwrap();
    assert!(tasks.is_empty());

    // And a second manual check reports no new stories either.
    let tasks = pipeline.check_account("alice").await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn check_account_propagates_fetch_errors() {
    let responses =
        HashMap::from([("alice".to_string(), Err("rate limited".to_string()))]);
    let (pipeline, _db, _dir) = setup(responses, &["alice"]).await;
    let err = pipeline.check_account("alice").await.unwrap_err();
    assert!(matches!(err, GlimpseError::Fetch { .. }));
}

#[tokio::test]
async fn backlog_returns_all_stored_stories() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(60, MediaKind::Image), story(61, MediaKind::Video)]),
    )]);
    let (pipeline, _db, _dir) = setup(responses, &["alice"]).await;
    pipeline.run_cycle().await.unwrap();

    let backlog = pipeline.backlog("alice").await.unwrap();
    assert_eq!(backlog.len(), 2);
    assert!(pipeline.backlog("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn deliver_all_isolates_per_recipient_failures() {
    let responses = HashMap::from([(
        "alice".to_string(),
        Ok(vec![story(70, MediaKind::Image)]),
    )]);
    let (pipeline, db, _dir) = setup(responses, &["alice"]).await;
    recipients::ensure_recipient(&db, 1).await.unwrap();
    recipients::ensure_recipient(&db, 2).await.unwrap();

    let tasks = pipeline.run_cycle().await.unwrap();
    assert_eq!(tasks.len(), 2);

    let channel = RecordingChannel {
        fail_for_chat: Some(1),
        ..Default::default()
    };
    let delivered = deliver_all(&channel, &tasks).await;
    assert_eq!(delivered, 1);

    let sent = channel.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 2);
    assert_eq!(sent[0].2, vec![70]);
}
