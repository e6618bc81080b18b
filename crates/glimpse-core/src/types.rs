// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the ledger, pipeline, and adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Media kind of a story. Stored in the ledger as its lowercase string form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// One live story as returned by the content fetcher, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedStory {
    /// Globally unique remote identifier. The deduplication key.
    pub remote_id: i64,
    /// When the story was posted.
    pub taken_at: DateTime<Utc>,
    pub kind: MediaKind,
    /// Playback length in seconds. Only meaningful for videos.
    pub video_duration: Option<f64>,
    /// Remote URL of the media payload.
    pub media_url: String,
}

/// A story ready to be persisted: a fetched story plus the outcome of its
/// media download. Input to the ledger's batch insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub remote_id: i64,
    pub taken_at: DateTime<Utc>,
    pub kind: MediaKind,
    pub media_path: Option<String>,
    pub video_duration: Option<f64>,
}

impl NewStory {
    /// Pairs a fetched story with its downloaded media path (`None` when the
    /// download failed; the story is still persisted so it is never re-sent).
    pub fn from_fetched(story: &FetchedStory, media_path: Option<String>) -> Self {
        Self {
            remote_id: story.remote_id,
            taken_at: story.taken_at,
            kind: story.kind,
            media_path,
            video_duration: story.video_duration,
        }
    }
}

/// A tracked source account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAccount {
    pub id: i64,
    pub handle: String,
    pub created_at: String,
}

/// A persisted story row. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRecord {
    pub id: i64,
    pub remote_id: i64,
    pub account_id: i64,
    /// RFC 3339 timestamp of when the story was posted.
    pub taken_at: String,
    pub kind: MediaKind,
    /// Local path of the downloaded media, if the download succeeded.
    pub media_path: Option<String>,
    pub video_duration: Option<f64>,
    pub created_at: String,
}

/// A subscribed chat row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRecord {
    pub id: i64,
    pub chat_id: i64,
    pub created_at: String,
}

/// One pending delivery: the new stories of one account, addressed to one
/// recipient. Constructed by the pipeline after a successful persist; the
/// poll loop (or command handler) owns the actual send.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryTask {
    pub chat_id: i64,
    pub handle: String,
    pub stories: Vec<StoryRecord>,
}
