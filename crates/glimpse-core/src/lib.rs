// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Glimpse story relay bot.
//!
//! Provides the shared error type, domain types, and the collaborator traits
//! implemented by the Instagram fetcher and the Telegram delivery channel.

pub mod error;
pub mod traits;
pub mod types;

pub use error::GlimpseError;
pub use traits::{ContentFetcher, DeliveryChannel};
pub use types::{
    DeliveryTask, FetchedStory, MediaKind, NewStory, RecipientRecord, SourceAccount, StoryRecord,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glimpse_error_has_all_variants() {
        let _config = GlimpseError::Config("test".into());
        let _storage = GlimpseError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _fetch = GlimpseError::fetch("alice", "timed out");
        let _dup = GlimpseError::DuplicateItem { remote_id: 7 };
        let _delivery = GlimpseError::Delivery {
            message: "test".into(),
            source: None,
        };
        let _internal = GlimpseError::Internal("test".into());
    }

    #[test]
    fn fetch_error_names_the_handle() {
        let err = GlimpseError::fetch("alice", "connection reset");
        assert_eq!(
            err.to_string(),
            "fetch error for @alice: connection reset"
        );
    }

    #[test]
    fn duplicate_error_names_the_remote_id() {
        let err = GlimpseError::DuplicateItem { remote_id: 42 };
        assert!(err.to_string().contains("42"));
    }
}
