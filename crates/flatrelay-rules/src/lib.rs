// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule engine, dedup cursor tracking and notification rendering.
//!
//! Everything here is synchronous and free of I/O; the poller drives it.

pub mod dedup;
pub mod engine;
pub mod render;

pub use dedup::{mark_processed, new_events};
pub use engine::{evaluate, Evaluation};
pub use render::{escape_markdown, event_url, render_notification};
