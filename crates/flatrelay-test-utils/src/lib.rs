// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles and fixtures for Flatrelay.
//!
//! - [`MockChat`]: chat adapter that captures sends and injects failures.
//! - [`ScriptedFeed`]: feed source with per-token queued outcomes.
//! - [`MemoryStore`]: user store with save failure injection.

pub mod fixtures;
pub mod memory_store;
pub mod mock_chat;
pub mod scripted_feed;

pub use fixtures::{channel_message, direct_message, event_by, page, test_vault, typed_event, UserBuilder};
pub use memory_store::MemoryStore;
pub use mock_chat::{MockChat, SentMessage};
pub use scripted_feed::{FeedOutcome, ScriptedFeed};
