// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram delivery channel and command bot for Glimpse.
//!
//! Implements [`DeliveryChannel`] for the Telegram Bot API via teloxide,
//! sending persisted stories as media groups, and runs the command
//! dispatcher that handles subscriptions and manual polls.

pub mod commands;
pub mod dispatcher;

use std::path::PathBuf;

use async_trait::async_trait;
use glimpse_core::{DeliveryChannel, GlimpseError, MediaKind, StoryRecord};
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, InputMediaVideo};
use tracing::{debug, warn};

/// Telegram can take at most this many items per media group.
const MEDIA_GROUP_LIMIT: usize = 10;

/// Telegram channel implementing [`DeliveryChannel`].
///
/// Sends stories from the local media cache as albums, chunked to the
/// Bot API's media-group limit. Stories whose download failed (no media
/// path on record) are skipped with a warning. After a send the cache size
/// is checked against the configured limit and the chat is warned when it
/// is exceeded.
pub struct StoryBot {
    bot: Bot,
    media_dir: PathBuf,
    temp_limit_mb: u64,
}

impl StoryBot {
    /// Creates a new Telegram channel.
    ///
    /// Requires a non-empty bot token.
    pub fn new(token: &str, media_dir: PathBuf, temp_limit_mb: u64) -> Result<Self, GlimpseError> {
        if token.is_empty() {
            return Err(GlimpseError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            bot: Bot::new(token),
            media_dir,
            temp_limit_mb,
        })
    }

    /// Warn the chat when the media cache has outgrown the configured limit.
    async fn warn_if_cache_full(&self, chat: ChatId) {
        let dir = self.media_dir.clone();
        let size = tokio::task::spawn_blocking(move || glimpse_instagram::dir_size_mb(&dir)).await;

        if let Ok(Ok(mb)) = size
            && mb > self.temp_limit_mb
        {
            let text = format!(
                "Heads up: the media cache has grown to {mb} MB, over the {} MB limit.",
                self.temp_limit_mb
            );
            if let Err(e) = self.bot.send_message(chat, text).await {
                warn!(error = %e, "could not send cache-size warning");
            }
        }
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

struct MediaItem {
    kind: MediaKind,
    path: PathBuf,
}

#[async_trait]
impl DeliveryChannel for StoryBot {
    async fn send_group(
        &self,
        chat_id: i64,
        handle: &str,
        stories: &[StoryRecord],
    ) -> Result<(), GlimpseError> {
        let chat = ChatId(chat_id);
        let caption = format!("@{handle}");

        let mut items = Vec::new();
        for story in stories {
            match story.media_path.as_deref() {
                Some(path) => items.push(MediaItem {
                    kind: story.kind,
                    path: PathBuf::from(path),
                }),
                None => {
                    warn!(
                        handle,
                        remote_id = story.remote_id,
                        "story has no media file, skipping"
                    );
                }
            }
        }

        if items.is_empty() {
            debug!(handle, chat_id, "nothing sendable in this batch");
            return Ok(());
        }

        let mut first = true;
        for chunk in items.chunks(MEDIA_GROUP_LIMIT) {
            let chunk_caption = first.then(|| caption.clone());
            first = false;

            // The Bot API rejects one-item albums, so singletons go out as
            // plain photo/video messages.
            if let [item] = chunk {
                let file = InputFile::file(item.path.clone());
                let result = match item.kind {
                    MediaKind::Image => {
                        let mut req = self.bot.send_photo(chat, file);
                        if let Some(c) = chunk_caption {
                            req = req.caption(c);
                        }
                        req.await.map(|_| ())
                    }
                    MediaKind::Video => {
                        let mut req = self.bot.send_video(chat, file);
                        if let Some(c) = chunk_caption {
                            req = req.caption(c);
                        }
                        req.await.map(|_| ())
                    }
                };
                result.map_err(|e| send_err(chat_id, e))?;
                continue;
            }

            let group: Vec<InputMedia> = chunk
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let file = InputFile::file(item.path.clone());
                    let item_caption = (i == 0).then(|| chunk_caption.clone()).flatten();
                    match item.kind {
                        MediaKind::Image => {
                            let mut media = InputMediaPhoto::new(file);
                            if let Some(c) = item_caption {
                                media = media.caption(c);
                            }
                            InputMedia::Photo(media)
                        }
                        MediaKind::Video => {
                            let mut media = InputMediaVideo::new(file);
                            if let Some(c) = item_caption {
                                media = media.caption(c);
                            }
                            InputMedia::Video(media)
                        }
                    }
                })
                .collect();

            self.bot
                .send_media_group(chat, group)
                .await
                .map_err(|e| send_err(chat_id, e))?;
        }

        debug!(handle, chat_id, count = items.len(), "stories delivered");
        self.warn_if_cache_full(chat).await;
        Ok(())
    }
}

fn send_err(chat_id: i64, e: teloxide::RequestError) -> GlimpseError {
    GlimpseError::Delivery {
        message: format!("failed to send media to chat {chat_id}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_token() {
        assert!(StoryBot::new("", PathBuf::from("/tmp/media"), 256).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        assert!(
            StoryBot::new(
                "123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11",
                PathBuf::from("/tmp/media"),
                256
            )
            .is_ok()
        );
    }
}
