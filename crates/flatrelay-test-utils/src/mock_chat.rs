// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat adapter for deterministic testing.
//!
//! `MockChat` captures every successful send and lets tests make channels
//! disappear or users block the bot. A user's direct-message conversation
//! uses the user's id as its channel id.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use flatrelay_core::traits::{ChatAdapter, RelayAdapter};
use flatrelay_core::types::{AdapterType, ChannelId, ChatTarget, HealthStatus, InboundMessage, UserId};
use flatrelay_core::RelayError;

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target: ChatTarget,
    pub text: String,
}

#[derive(Default)]
struct Failures {
    channels: HashSet<ChannelId>,
    blocked: HashSet<UserId>,
    unresolvable: HashSet<UserId>,
}

/// A mock chat platform.
pub struct MockChat {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failures: Arc<Mutex<Failures>>,
    notify: Arc<Notify>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Failures::default())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Direct-message target the mock hands out for `user`.
    pub fn direct_target(user: UserId) -> ChatTarget {
        ChatTarget {
            channel: ChannelId(user.0),
            private: true,
        }
    }

    /// Queue a message for `receive()`.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Make sends to and resolution of `channel` fail.
    pub async fn fail_channel(&self, channel: ChannelId) {
        self.failures.lock().await.channels.insert(channel);
    }

    /// Make direct messages to `user` fail while resolution still succeeds.
    pub async fn block_user(&self, user: UserId) {
        self.failures.lock().await.blocked.insert(user);
    }

    /// Make resolving the direct conversation with `user` fail.
    pub async fn make_unresolvable(&self, user: UserId) {
        self.failures.lock().await.unresolvable.insert(user);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts sent into `channel`, in order.
    pub async fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.target.channel == channel)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Texts sent to `user` by direct message, in order.
    pub async fn direct_messages(&self, user: UserId) -> Vec<String> {
        self.sent_to(ChannelId(user.0)).await
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayAdapter for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for MockChat {
    async fn connect(&mut self) -> Result<(), RelayError> {
        Ok(())
    }

    async fn open_direct(&self, user: UserId) -> Result<ChatTarget, RelayError> {
        if self.failures.lock().await.unresolvable.contains(&user) {
            return Err(RelayError::chat(format!("unknown user {user}")));
        }
        Ok(Self::direct_target(user))
    }

    async fn open_channel(&self, channel: ChannelId) -> Result<ChatTarget, RelayError> {
        if self.failures.lock().await.channels.contains(&channel) {
            return Err(RelayError::chat(format!("unknown channel {channel}")));
        }
        Ok(ChatTarget {
            channel,
            private: false,
        })
    }

    async fn send(&self, target: &ChatTarget, text: &str) -> Result<(), RelayError> {
        {
            let failures = self.failures.lock().await;
            if failures.channels.contains(&target.channel) {
                return Err(RelayError::chat(format!("missing access to {}", target.channel)));
            }
            if target.private && failures.blocked.contains(&UserId(target.channel.0)) {
                return Err(RelayError::chat("cannot send messages to this user"));
            }
        }
        self.sent.lock().await.push(SentMessage {
            target: *target,
            text: text.to_string(),
        });
        Ok(())
    }

    fn mention(&self, user: UserId) -> String {
        format!("<@{user}>")
    }

    async fn receive(&self) -> Result<InboundMessage, RelayError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            self.notify.notified().await;
        }
    }
}
