// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform adapter: resolve conversations, send text, receive commands.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::RelayAdapter;
use crate::types::{ChannelId, ChatTarget, InboundMessage, UserId};

#[async_trait]
pub trait ChatAdapter: RelayAdapter {
    /// Establishes the connection and starts delivering inbound messages.
    async fn connect(&mut self) -> Result<(), RelayError>;

    /// Resolves the direct-message conversation with `user`.
    async fn open_direct(&self, user: UserId) -> Result<ChatTarget, RelayError>;

    /// Resolves a shared channel, failing if it is gone or inaccessible.
    async fn open_channel(&self, channel: ChannelId) -> Result<ChatTarget, RelayError>;

    /// Posts `text` into `target`.
    async fn send(&self, target: &ChatTarget, text: &str) -> Result<(), RelayError>;

    /// Mention markup for `user`.
    fn mention(&self, user: UserId) -> String;

    /// Receives the next inbound message.
    async fn receive(&self) -> Result<InboundMessage, RelayError>;
}
