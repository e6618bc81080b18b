// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content fetcher trait for remote story sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::GlimpseError;
use crate::types::FetchedStory;

/// Fetches the current live stories of a tracked account and downloads
/// their media. Implementations hold their own authenticated session; the
/// pipeline never sees credentials.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns the full list of currently live stories for `handle`.
    ///
    /// Fails with [`GlimpseError::Fetch`] on network or auth errors; the
    /// caller isolates the failure to this account's slice of the cycle.
    async fn fetch_stories(&self, handle: &str) -> Result<Vec<FetchedStory>, GlimpseError>;

    /// Downloads the media payload of `story` into `dest_dir`, returning
    /// the local path of the written file.
    async fn download(
        &self,
        handle: &str,
        story: &FetchedStory,
        dest_dir: &Path,
    ) -> Result<PathBuf, GlimpseError>;
}
