// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed event and user record builders.

use secrecy::SecretString;
use serde_json::json;

use flatrelay_core::{
    Category, ChannelId, CredentialVault, Destination, FeedEvent, InboundMessage, Sign, UserId,
    UserRecord,
};
use flatrelay_vault::CredentialCipher;

/// Cipher with a fixed key, so sealed fixtures open across instances.
pub fn test_vault() -> CredentialCipher {
    CredentialCipher::from_key([7u8; 32])
}

/// Event with an id, a type and a stock actor.
pub fn typed_event(id: &str, kind: &str) -> FeedEvent {
    event_by(id, kind, "a0", "someone")
}

/// Event of `kind` triggered by feed user `actor_id`.
pub fn event_by(id: &str, kind: &str, actor_id: &str, username: &str) -> FeedEvent {
    serde_json::from_value(json!({
        "id": id,
        "type": kind,
        "actor": {
            "id": actor_id,
            "username": username,
            "printableName": username,
            "htmlUrl": format!("https://flat.io/{username}"),
        },
        "attachments": {
            "score": {"id": "s1", "htmlUrl": "https://flat.io/score/s1"},
            "scoreComment": "c1",
        },
    }))
    .unwrap_or_else(|e| panic!("fixture event must parse: {e}"))
}

/// Newest-first page of `userFollow` events with the given ids.
pub fn page(ids: &[&str]) -> Vec<FeedEvent> {
    ids.iter().map(|id| typed_event(id, "userFollow")).collect()
}

/// Private message from `author` in their direct conversation.
pub fn direct_message(author: UserId, content: &str) -> InboundMessage {
    InboundMessage {
        author,
        conversation: ChannelId(author.0),
        private: true,
        content: content.to_string(),
    }
}

/// Message from `author` in a shared channel.
pub fn channel_message(author: UserId, channel: ChannelId, content: &str) -> InboundMessage {
    InboundMessage {
        author,
        conversation: channel,
        private: false,
        content: content.to_string(),
    }
}

/// Builder for registered users.
pub struct UserBuilder {
    id: UserId,
    token: String,
    selectors: Vec<(Category, String, String)>,
    paused: bool,
    override_rules: bool,
    destination: Destination,
    processed: Vec<String>,
    capacity: usize,
}

impl UserBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            id: UserId(id),
            token: format!("token-{id}"),
            selectors: Vec::new(),
            paused: false,
            override_rules: false,
            destination: Destination::Direct,
            processed: Vec::new(),
            capacity: 100,
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn include(mut self, category: Category, value: &str) -> Self {
        self.selectors
            .push((category, Sign::Include.key(value), value.to_string()));
        self
    }

    pub fn exclude(mut self, category: Category, value: &str) -> Self {
        self.selectors
            .push((category, Sign::Exclude.key(value), value.to_string()));
        self
    }

    /// Actor selector keyed on `actor_id` with a cached `username`.
    pub fn actor(mut self, sign: Sign, actor_id: &str, username: &str) -> Self {
        self.selectors
            .push((Category::Actor, sign.key(actor_id), username.to_string()));
        self
    }

    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }

    pub fn override_rules(mut self) -> Self {
        self.override_rules = true;
        self
    }

    pub fn channel(mut self, channel: u64, mention: bool) -> Self {
        self.destination = Destination::Channel {
            channel_id: ChannelId(channel),
            mention,
        };
        self
    }

    /// Cursor contents, oldest first.
    pub fn processed(mut self, ids: &[&str]) -> Self {
        self.processed = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the record, sealing the token with [`test_vault`].
    pub fn build(self) -> UserRecord {
        let sealed = test_vault()
            .seal(&SecretString::from(self.token))
            .unwrap_or_else(|e| panic!("fixture token must seal: {e}"));
        let mut record = UserRecord::new(self.id, sealed, self.capacity);
        for (category, key, display) in self.selectors {
            record.rules.entry(category).insert(key, &display);
        }
        record.paused = self.paused;
        record.override_rules = self.override_rules;
        record.destination = self.destination;
        for id in self.processed {
            record.processed_ids.push(id.as_str().into());
        }
        record
    }
}
