// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery channel trait for outbound story transmission.

use async_trait::async_trait;

use crate::error::GlimpseError;
use crate::types::StoryRecord;

/// Transmits a set of stories to one recipient as a single grouped message.
///
/// The pipeline constructs delivery tasks but never sends; the poll loop and
/// command handlers push tasks through this trait.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Sends `stories` (all belonging to the account `handle`) to the chat
    /// identified by `chat_id` as one media group.
    ///
    /// Fails with [`GlimpseError::Delivery`]; callers log and continue with
    /// the remaining recipients.
    async fn send_group(
        &self,
        chat_id: i64,
        handle: &str,
        stories: &[StoryRecord],
    ) -> Result<(), GlimpseError>;
}
