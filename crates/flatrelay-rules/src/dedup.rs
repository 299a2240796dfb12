// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! New-event detection against a user's dedup cursor.
//!
//! The feed is newest-first, so everything after the first already
//! processed id is assumed processed too.

use flatrelay_core::{FeedEvent, ProcessedIds};

/// Leading run of `page` whose ids are not yet in `cursor`, newest-first.
pub fn new_events<'a>(page: &'a [FeedEvent], cursor: &ProcessedIds) -> &'a [FeedEvent] {
    let end = page
        .iter()
        .position(|event| cursor.contains(event.id()))
        .unwrap_or(page.len());
    &page[..end]
}

/// Appends the ids of `fresh` (newest-first, as returned by [`new_events`])
/// in discovery order, oldest first.
pub fn mark_processed(cursor: &mut ProcessedIds, fresh: &[FeedEvent]) {
    for event in fresh.iter().rev() {
        cursor.push(event.id().clone());
    }
}
