// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway event handling.
//!
//! Converts Discord messages into channel-agnostic [`InboundMessage`]s and
//! queues them for the command pump. Bot authors are filtered out here.

use async_trait::async_trait;
use flatrelay_core::{ChannelId, InboundMessage, UserId};
use serenity::all::{ActivityData, Context, EventHandler, Message, Ready};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Presence shown once the gateway session is ready.
pub const ACTIVITY: &str = "with the Flat.io API";

pub(crate) struct Handler {
    pub(crate) tx: mpsc::Sender<InboundMessage>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if msg.content.trim().is_empty() {
            debug!(message_id = %msg.id, "ignoring message without text");
            return;
        }
        let inbound = to_inbound(
            msg.author.id.get(),
            msg.channel_id.get(),
            msg.guild_id.is_none(),
            &msg.content,
        );
        if self.tx.send(inbound).await.is_err() {
            warn!("inbound channel closed, dropping message");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::playing(ACTIVITY)));
        info!(
            bot = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord gateway ready"
        );
    }
}

/// Builds an [`InboundMessage`] from raw Discord ids.
///
/// Messages outside any guild are direct messages.
pub fn to_inbound(author: u64, channel: u64, private: bool, content: &str) -> InboundMessage {
    InboundMessage {
        author: UserId(author),
        conversation: ChannelId(channel),
        private,
        content: content.to_string(),
    }
}
