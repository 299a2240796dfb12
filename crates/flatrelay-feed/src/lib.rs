// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited access to the Flat.io notification feed.

pub mod fetcher;
pub mod refresh;

pub use fetcher::Fetcher;
pub use refresh::run_refresh_loop;
