// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord chat adapter for the Flatrelay notification relay.
//!
//! Implements [`ChatAdapter`] with serenity: a gateway client feeds inbound
//! messages into a bounded queue, and outbound sends go through the REST
//! client directly.

pub mod handler;

use std::sync::Arc;

use async_trait::async_trait;
use flatrelay_config::model::DiscordConfig;
use flatrelay_core::traits::{ChatAdapter, RelayAdapter};
use flatrelay_core::types::{AdapterType, ChannelId, ChatTarget, HealthStatus, InboundMessage, UserId};
use flatrelay_core::RelayError;
use serenity::all::{
    Channel, ChannelId as DiscordChannelId, Client, GatewayIntents, Http, UserId as DiscordUserId,
};
use serenity::gateway::ShardManager;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::handler::Handler;

const INBOUND_QUEUE: usize = 100;

/// Discord adapter implementing [`ChatAdapter`].
pub struct DiscordChat {
    token: String,
    http: Arc<Http>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    shard_manager: Option<Arc<ShardManager>>,
    client_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DiscordChat {
    /// Creates the adapter. Requires `config.bot_token` to be set.
    pub fn new(config: &DiscordConfig) -> Result<Self, RelayError> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| RelayError::Config("discord.bot_token is required to serve".into()))?;
        if token.trim().is_empty() {
            return Err(RelayError::Config("discord.bot_token cannot be empty".into()));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        Ok(Self {
            token: token.to_string(),
            http: Arc::new(Http::new(token)),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            shard_manager: None,
            client_handle: None,
        })
    }

    /// Gateway intents: guild and direct messages with their content.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

fn chat_err(message: String, e: serenity::Error) -> RelayError {
    RelayError::Chat {
        message,
        source: Some(Box::new(e)),
    }
}

fn discord_user(id: UserId) -> Result<DiscordUserId, RelayError> {
    if id.0 == 0 {
        return Err(RelayError::chat("user id 0 is not a valid discord id"));
    }
    Ok(DiscordUserId::new(id.0))
}

fn discord_channel(id: ChannelId) -> Result<DiscordChannelId, RelayError> {
    if id.0 == 0 {
        return Err(RelayError::chat("channel id 0 is not a valid discord id"));
    }
    Ok(DiscordChannelId::new(id.0))
}

#[async_trait]
impl RelayAdapter for DiscordChat {
    fn name(&self) -> &str {
        "discord"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.http.get_current_user().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Discord API unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        debug!("discord adapter shutting down");
        if let Some(manager) = &self.shard_manager {
            manager.shutdown_all().await;
        }
        if let Some(handle) = &self.client_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for DiscordChat {
    async fn connect(&mut self) -> Result<(), RelayError> {
        if self.client_handle.is_some() {
            return Ok(());
        }

        let mut client = Client::builder(&self.token, Self::intents())
            .event_handler(Handler {
                tx: self.inbound_tx.clone(),
            })
            .await
            .map_err(|e| chat_err(format!("failed to build discord client: {e}"), e))?;
        self.shard_manager = Some(client.shard_manager.clone());

        info!("starting discord gateway session");
        self.client_handle = Some(tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "discord gateway session ended");
            }
        }));
        Ok(())
    }

    async fn open_direct(&self, user: UserId) -> Result<ChatTarget, RelayError> {
        let channel = discord_user(user)?
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| chat_err(format!("cannot open DM with {user}: {e}"), e))?;
        Ok(ChatTarget {
            channel: ChannelId(channel.id.get()),
            private: true,
        })
    }

    async fn open_channel(&self, channel: ChannelId) -> Result<ChatTarget, RelayError> {
        let resolved = discord_channel(channel)?
            .to_channel(&self.http)
            .await
            .map_err(|e| chat_err(format!("cannot resolve channel {channel}: {e}"), e))?;
        let private = match resolved {
            Channel::Guild(_) => false,
            Channel::Private(_) => true,
            _ => return Err(RelayError::chat(format!("channel {channel} cannot receive messages"))),
        };
        Ok(ChatTarget { channel, private })
    }

    async fn send(&self, target: &ChatTarget, text: &str) -> Result<(), RelayError> {
        discord_channel(target.channel)?
            .say(&self.http, text)
            .await
            .map_err(|e| chat_err(format!("failed to send to {}: {e}", target.channel), e))?;
        Ok(())
    }

    fn mention(&self, user: UserId) -> String {
        format!("<@{user}>")
    }

    async fn receive(&self) -> Result<InboundMessage, RelayError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| RelayError::chat("discord inbound channel closed"))
    }
}
