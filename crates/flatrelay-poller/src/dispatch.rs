// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery dispatcher.
//!
//! Sends rendered notifications to a user's destination. A failing channel
//! reverts the user to direct messages for good: the user is told once and
//! the original message follows by DM, so nothing is lost. A failing direct
//! message is [`RelayError::Unreachable`].

use std::sync::Arc;

use flatrelay_core::notices;
use flatrelay_core::{ChatAdapter, ChatTarget, Destination, RelayError, UserRecord};
use tracing::{debug, warn};

/// Where a delivered message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Direct,
    Channel,
    /// The channel failed; the user now receives direct messages. The
    /// record changed and must be persisted.
    FellBack,
}

#[derive(Clone)]
pub struct Dispatcher {
    chat: Arc<dyn ChatAdapter>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(chat: Arc<dyn ChatAdapter>, prefix: impl Into<String>) -> Self {
        Self {
            chat,
            prefix: prefix.into(),
        }
    }

    pub fn chat(&self) -> &Arc<dyn ChatAdapter> {
        &self.chat
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolves, caching on the record, the user's direct conversation.
    pub async fn recipient(&self, user: &mut UserRecord) -> Result<ChatTarget, RelayError> {
        if let Some(target) = user.handles.recipient {
            return Ok(target);
        }
        let target = self.chat.open_direct(user.id).await.map_err(|e| RelayError::Unreachable {
            user: user.id,
            message: e.to_string(),
        })?;
        user.handles.recipient = Some(target);
        Ok(target)
    }

    /// Sends `text` to the user by direct message.
    pub async fn notify_direct(&self, user: &mut UserRecord, text: &str) -> Result<(), RelayError> {
        let target = self.recipient(user).await?;
        self.chat
            .send(&target, text)
            .await
            .map_err(|e| RelayError::Unreachable {
                user: user.id,
                message: e.to_string(),
            })
    }

    /// Resolves and caches the configured channel, if any.
    pub async fn resolve_channel(&self, user: &mut UserRecord) -> Result<Option<ChatTarget>, RelayError> {
        let Destination::Channel { channel_id, .. } = user.destination else {
            user.handles.channel = None;
            return Ok(None);
        };
        if let Some(target) = user.handles.channel.filter(|t| t.channel == channel_id) {
            return Ok(Some(target));
        }
        let target = self.chat.open_channel(channel_id).await?;
        user.handles.channel = Some(target);
        Ok(Some(target))
    }

    /// Resolves both handles at startup.
    ///
    /// An unresolvable recipient is an error. An unresolvable channel
    /// reverts the user to direct messages and tells them; the returned
    /// flag reports that the record changed.
    pub async fn resolve_handles(&self, user: &mut UserRecord) -> Result<bool, RelayError> {
        self.recipient(user).await?;
        match self.resolve_channel(user).await {
            Ok(_) => Ok(false),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "configured channel unavailable, reverting to DMs");
                self.fall_back(user).await?;
                Ok(true)
            }
        }
    }

    /// Sends a notification to the user's destination.
    pub async fn deliver(&self, user: &mut UserRecord, text: &str) -> Result<Delivery, RelayError> {
        let Destination::Channel { mention, .. } = user.destination else {
            self.notify_direct(user, text).await?;
            return Ok(Delivery::Direct);
        };

        let sent = match self.resolve_channel(user).await {
            Ok(Some(target)) => {
                let body = if mention {
                    format!("{} {text}", self.chat.mention(user.id))
                } else {
                    text.to_string()
                };
                self.chat.send(&target, &body).await
            }
            Ok(None) => Err(RelayError::Internal("channel destination without channel".to_string())),
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                debug!(user_id = %user.id, "delivered to channel");
                Ok(Delivery::Channel)
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "channel delivery failed, reverting to DMs");
                self.fall_back(user).await?;
                self.notify_direct(user, text).await?;
                Ok(Delivery::FellBack)
            }
        }
    }

    async fn fall_back(&self, user: &mut UserRecord) -> Result<(), RelayError> {
        user.destination = Destination::Direct;
        user.handles.channel = None;
        self.notify_direct(user, &notices::channel_lost(&self.prefix)).await
    }
}
