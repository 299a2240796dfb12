// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered user records and the per-user dedup cursor.

use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::event::FeedEvent;
use crate::rules::RuleSet;
use crate::types::{ChatTarget, Destination, EventId, SendHere, UserId};

/// Cursor capacity used until configuration supplies one.
pub const DEFAULT_CURSOR_CAPACITY: usize = 100;

/// Bounded, ordered record of recently processed event ids.
///
/// Oldest ids sit at the front and are evicted first once capacity is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedIds {
    ids: VecDeque<EventId>,
    capacity: usize,
}

impl ProcessedIds {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting the oldest ids if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    /// Appends `id` as the newest entry.
    pub fn push(&mut self, id: EventId) {
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    /// Replaces the contents with one newest-first feed page, inserted oldest-first.
    pub fn seed(&mut self, page: &[FeedEvent]) {
        self.ids.clear();
        for event in page.iter().rev() {
            self.push(event.id().clone());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &EventId> {
        self.ids.iter()
    }
}

impl Default for ProcessedIds {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_CAPACITY)
    }
}

impl Serialize for ProcessedIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.ids.iter())
    }
}

impl<'de> Deserialize<'de> for ProcessedIds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<EventId>::deserialize(deserializer)?;
        let mut cursor = ProcessedIds::new(DEFAULT_CURSOR_CAPACITY.max(ids.len()));
        for id in ids {
            cursor.push(id);
        }
        Ok(cursor)
    }
}

/// An encrypted feed credential. Only the vault can turn it back into a token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedCredential(pub String);

impl std::fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedCredential([REDACTED])")
    }
}

/// Runtime-only conversation handles, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHandles {
    pub recipient: Option<ChatTarget>,
    pub channel: Option<ChatTarget>,
}

/// One registered end user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(rename = "api_key")]
    pub credential: SealedCredential,
    #[serde(rename = "important", default)]
    pub rules: RuleSet,
    #[serde(rename = "override", default)]
    pub override_rules: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(
        rename = "sendhere",
        default,
        serialize_with = "serialize_destination",
        deserialize_with = "deserialize_destination"
    )]
    pub destination: Destination,
    #[serde(default)]
    pub processed_ids: ProcessedIds,
    #[serde(skip)]
    pub handles: ResolvedHandles,
}

impl UserRecord {
    /// Fresh record with canonical empty rules and direct-message delivery.
    pub fn new(id: UserId, credential: SealedCredential, cursor_capacity: usize) -> Self {
        Self {
            id,
            credential,
            rules: RuleSet::canonical(),
            override_rules: false,
            paused: false,
            destination: Destination::Direct,
            processed_ids: ProcessedIds::new(cursor_capacity),
            handles: ResolvedHandles::default(),
        }
    }

    /// Persistent fields equal, transient handles ignored.
    pub fn same_persisted_state(&self, other: &UserRecord) -> bool {
        self.id == other.id
            && self.credential == other.credential
            && self.rules == other.rules
            && self.override_rules == other.override_rules
            && self.paused == other.paused
            && self.destination == other.destination
            && self.processed_ids.iter().eq(other.processed_ids.iter())
    }
}

fn serialize_destination<S: Serializer>(dest: &Destination, serializer: S) -> Result<S::Ok, S::Error> {
    SendHere::from(*dest).serialize(serializer)
}

fn deserialize_destination<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Destination, D::Error> {
    SendHere::deserialize(deserializer).map(Destination::from)
}
