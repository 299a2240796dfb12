// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Flatrelay notification relay.
//!
//! This crate provides the error type, the feed event and user record
//! models, and the adapter traits implemented by the chat, feed, store and
//! vault crates.

pub mod error;
pub mod event;
pub mod notices;
pub mod record;
pub mod rules;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use event::FeedEvent;
pub use record::{ProcessedIds, ResolvedHandles, SealedCredential, UserRecord};
pub use rules::{Category, Rule, RuleSet, Selectors, Sign};
pub use types::{
    AdapterType, ChannelId, ChatTarget, Destination, EventId, HealthStatus, InboundMessage, UserId,
};

pub use traits::{ChatAdapter, CredentialVault, FeedSource, FeedUser, RelayAdapter, UserStore};
