// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! New-content detection and at-most-once delivery for Glimpse.
//!
//! [`Pipeline`] runs one fetch-diff-persist-fanout cycle; [`PollLoop`]
//! drives it on a fixed interval. Command handlers invoke the same
//! [`Pipeline`] instance out-of-band, so manual and periodic checks share
//! one ledger and never double-deliver.

pub mod pipeline;
pub mod poll;

pub use pipeline::Pipeline;
pub use poll::{PollLoop, deliver_all};
