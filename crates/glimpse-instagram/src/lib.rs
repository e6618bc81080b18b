// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram content fetcher.
//!
//! Wraps the private web API behind the [`glimpse_core::ContentFetcher`]
//! trait: session login, story feed retrieval, and media downloads into the
//! local media directory.

mod client;
mod types;

pub use client::InstagramClient;

use std::path::Path;

/// Total size of the media directory in megabytes, rounded down.
///
/// Walks the tree synchronously; callers on the async runtime should wrap
/// this in `spawn_blocking`.
pub fn dir_size_mb(root: &Path) -> std::io::Result<u64> {
    fn walk(dir: &Path) -> std::io::Result<u64> {
        let mut total = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_dir() {
                total += walk(&entry.path())?;
            } else {
                total += meta.len();
            }
        }
        Ok(total)
    }

    if !root.exists() {
        return Ok(0);
    }
    Ok(walk(root)? / (1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_size_counts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.jpg"), vec![0u8; 1024 * 1024]).unwrap();
        std::fs::write(dir.path().join("sub/b.mp4"), vec![0u8; 2 * 1024 * 1024]).unwrap();

        assert_eq!(dir_size_mb(dir.path()).unwrap(), 3);
    }

    #[test]
    fn dir_size_of_missing_dir_is_zero() {
        assert_eq!(dir_size_mb(Path::new("/nonexistent/glimpse-media")).unwrap(), 0);
    }
}
