// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed event model.
//!
//! Events are kept as loosely-typed JSON so rule categories can address any
//! nested field by dotted path. Only `id` is required at parse time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EventId;

/// One notification item returned by the upstream feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct FeedEvent {
    id: EventId,
    raw: Value,
}

impl TryFrom<Value> for FeedEvent {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let id = match raw.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("feed event id has unexpected type: {other}")),
            None => return Err("feed event is missing `id`".to_string()),
        };
        Ok(Self {
            id: EventId(id),
            raw,
        })
    }
}

impl From<FeedEvent> for Value {
    fn from(event: FeedEvent) -> Self {
        event.raw
    }
}

impl FeedEvent {
    /// Event identifier.
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Notification type (`scoreComment`, `userFollow`, ...), empty if absent.
    pub fn kind(&self) -> &str {
        self.str_at(&["type"]).unwrap_or_default()
    }

    /// Resolves a dotted field path to a scalar string.
    ///
    /// Returns `None` when any segment is missing or the leaf is an object,
    /// array or null. Numbers and booleans are rendered in their JSON form.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<String> {
        let leaf = self.walk(path)?;
        match leaf {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Borrowing variant of [`lookup`](Self::lookup) for string leaves.
    pub fn str_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        self.walk(path)?.as_str()
    }

    pub fn actor_id(&self) -> Option<String> {
        self.lookup(&["actor", "id"])
    }

    pub fn actor_username(&self) -> Option<&str> {
        self.str_at(&["actor", "username"])
    }

    pub fn actor_printable_name(&self) -> Option<&str> {
        self.str_at(&["actor", "printableName"])
    }

    pub fn actor_url(&self) -> Option<&str> {
        self.str_at(&["actor", "htmlUrl"])
    }

    pub fn score_url(&self) -> Option<&str> {
        self.str_at(&["attachments", "score", "htmlUrl"])
    }

    pub fn score_comment(&self) -> Option<String> {
        self.lookup(&["attachments", "scoreComment"])
    }

    fn walk<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let mut cur = &self.raw;
        for segment in path {
            cur = cur.as_object()?.get(segment.as_ref())?;
        }
        Some(cur)
    }
}
