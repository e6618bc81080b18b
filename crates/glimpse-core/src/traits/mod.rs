// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the pipeline's seams.
//!
//! The pipeline talks to the outside world only through these traits, so
//! tests substitute fakes and the core diff-and-deliver logic stays free of
//! transport concerns.

pub mod channel;
pub mod fetcher;

pub use channel::DeliveryChannel;
pub use fetcher::ContentFetcher;
