// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the relay.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chat platform identity of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat platform conversation (guild channel or direct-message channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of one feed event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId(value.to_string())
    }
}

/// A resolved, sendable conversation handle.
///
/// Handles are cached on user records but are never the source of truth:
/// the stored user or channel id is, and the handle is re-resolved on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatTarget {
    /// Conversation to post into.
    pub channel: ChannelId,
    /// Whether the conversation is private to one user.
    pub private: bool,
}

impl ChatTarget {
    /// Target for replying in the conversation a message arrived from.
    pub fn reply_to(msg: &InboundMessage) -> Self {
        Self {
            channel: msg.conversation,
            private: msg.private,
        }
    }
}

/// Where a user's notifications go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// The user's direct messages.
    #[default]
    Direct,
    /// A shared channel, optionally prefixed with a mention of the user.
    Channel { channel_id: ChannelId, mention: bool },
}

impl Destination {
    /// Returns true when notifications go to a shared channel.
    pub fn is_channel(&self) -> bool {
        matches!(self, Destination::Channel { .. })
    }
}

/// Persisted form of [`Destination`], kept compatible with older snapshots
/// where `sendhere` carried only a boolean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendHere {
    #[serde(rename = "bool", default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<bool>,
}

impl From<SendHere> for Destination {
    fn from(raw: SendHere) -> Self {
        match (raw.enabled, raw.channel_id) {
            (true, Some(channel_id)) => Destination::Channel {
                channel_id,
                mention: raw.mention.unwrap_or(false),
            },
            _ => Destination::Direct,
        }
    }
}

impl From<Destination> for SendHere {
    fn from(dest: Destination) -> Self {
        match dest {
            Destination::Direct => SendHere::default(),
            Destination::Channel {
                channel_id,
                mention,
            } => SendHere {
                enabled: true,
                channel_id: Some(channel_id),
                mention: Some(mention),
            },
        }
    }
}

/// A chat message received from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Who wrote it.
    pub author: UserId,
    /// Conversation it was posted in.
    pub conversation: ChannelId,
    /// True for direct-message conversations.
    pub private: bool,
    /// Raw text content.
    pub content: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Chat,
    Feed,
    Store,
}
