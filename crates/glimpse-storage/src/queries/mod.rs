// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per ledger table.

pub mod accounts;
pub mod recipients;
pub mod stories;
