// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command handlers.
//!
//! Every handler takes the registry lock only for short read-modify-write
//! sections and releases it before any feed call, chat send, lookup pause
//! or confirmation wait.

use std::sync::Arc;
use std::time::Duration;

use flatrelay_config::model::RelayConfig;
use flatrelay_core::notices;
use flatrelay_core::{
    Category, ChatAdapter, ChatTarget, CredentialVault, Destination, FeedSource, FeedUser,
    InboundMessage, RelayError, Sign, UserId, UserRecord,
};
use flatrelay_registry::SharedRegistry;
use flatrelay_rules::escape_markdown;
use secrecy::SecretString;
use serde::Serializer;
use tracing::{debug, info, warn};

use crate::confirm::{Confirmation, ConfirmationWaiter};
use crate::parse::{parse, CommandName, Parsed};
use crate::texts;

/// Settings the handlers need from configuration.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub prefix: String,
    pub support_url: String,
    pub confirm_timeout: Duration,
    /// Pause after each username lookup.
    pub lookup_delay: Duration,
    pub cursor_capacity: usize,
}

impl From<&RelayConfig> for CommandSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            prefix: config.relay.command_prefix.clone(),
            support_url: config.relay.support_url.clone(),
            confirm_timeout: Duration::from_secs(config.commands.confirm_timeout_secs),
            lookup_delay: Duration::from_secs(config.commands.lookup_delay_secs),
            cursor_capacity: config.poller.cursor_capacity,
        }
    }
}

/// Executes chat commands against the registry.
pub struct CommandHandler {
    registry: SharedRegistry,
    feed: Arc<dyn FeedSource>,
    vault: Arc<dyn CredentialVault>,
    chat: Arc<dyn ChatAdapter>,
    waiter: ConfirmationWaiter,
    settings: CommandSettings,
}

impl CommandHandler {
    pub fn new(
        registry: SharedRegistry,
        feed: Arc<dyn FeedSource>,
        vault: Arc<dyn CredentialVault>,
        chat: Arc<dyn ChatAdapter>,
        settings: CommandSettings,
    ) -> Self {
        Self {
            registry,
            feed,
            vault,
            chat,
            waiter: ConfirmationWaiter::new(settings.confirm_timeout),
            settings,
        }
    }

    /// Waiter the inbound pump offers messages to before dispatching them.
    pub fn waiter(&self) -> &ConfirmationWaiter {
        &self.waiter
    }

    /// Handles one inbound message. Messages without the prefix are ignored.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<(), RelayError> {
        let prefix = self.settings.prefix.as_str();
        let Some(parsed) = parse(prefix, &msg.content) else {
            return Ok(());
        };

        let registered = self.registry.lock().await.contains(msg.author);
        if !registered {
            return self.handle_unregistered(msg, parsed).await;
        }

        match parsed {
            Parsed::Greeting => self.reply(msg, &texts::greeting(prefix)).await,
            Parsed::Unknown(word) => {
                debug!(user_id = %msg.author, command = %word, "unknown command");
                self.reply(msg, &texts::invalid_command(prefix)).await
            }
            Parsed::Command { name, args } => {
                debug!(user_id = %msg.author, command = %name, "handling command");
                match name {
                    CommandName::GetStarted => self.reply(msg, &texts::invalid_command(prefix)).await,
                    CommandName::AddRule => self.add_rule(msg, &args).await,
                    CommandName::RemoveRule => self.remove_rule(msg, &args).await,
                    CommandName::Override => self.toggle_override(msg).await,
                    CommandName::Pause => self.toggle_pause(msg).await,
                    CommandName::SendHere => self.send_here(msg, &args).await,
                    CommandName::Unregister => self.unregister(msg).await,
                    CommandName::UpdateToken => self.update_token(msg, &args).await,
                    CommandName::Rules => self.show_rules(msg).await,
                    CommandName::Version => {
                        self.reply(msg, &texts::version(&self.settings.support_url)).await
                    }
                    CommandName::Help => {
                        for part in texts::help(prefix, &self.settings.support_url) {
                            self.reply(msg, &part).await?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    async fn handle_unregistered(&self, msg: &InboundMessage, parsed: Parsed) -> Result<(), RelayError> {
        let prefix = self.settings.prefix.as_str();
        match parsed {
            Parsed::Command {
                name: CommandName::GetStarted,
                args,
            } if !args.is_empty() => {
                if !msg.private {
                    return self.reply(msg, &texts::dm_only(prefix, "getstarted")).await;
                }
                self.register(msg, &args[0]).await
            }
            _ => {
                self.reply(msg, &texts::welcome(prefix, &self.settings.support_url))
                    .await
            }
        }
    }

    async fn register(&self, msg: &InboundMessage, token: &str) -> Result<(), RelayError> {
        let token = SecretString::from(token.to_string());
        let page = match self.feed.fetch(&token).await {
            Ok(page) => page,
            Err(e) => {
                warn!(user_id = %msg.author, error = %e, "token check failed during registration");
                return self.retry_later(msg, "registration").await;
            }
        };
        if page.is_empty() {
            return self.reply(msg, texts::invalid_token()).await;
        }

        let mut record = UserRecord::new(msg.author, self.vault.seal(&token)?, self.settings.cursor_capacity);
        record.processed_ids.seed(&page);
        match self.registry.lock().await.add(record) {
            Ok(()) => {}
            Err(RelayError::DuplicateUser(_)) => {
                debug!(user_id = %msg.author, "already registered by a concurrent getstarted");
                return self.reply(msg, &texts::invalid_command(&self.settings.prefix)).await;
            }
            Err(e) => return Err(e),
        }
        info!(user_id = %msg.author, seeded = page.len(), "user registered");
        self.reply(msg, &texts::registered(&self.settings.prefix)).await
    }

    async fn add_rule(&self, msg: &InboundMessage, args: &[String]) -> Result<(), RelayError> {
        let prefix = self.settings.prefix.as_str();
        let Some(sign_word) = args.first() else {
            return self
                .reply(msg, &texts::addrule_usage(prefix, "include/exclude was missing"))
                .await;
        };
        let (Some(category_name), Some(values)) = (args.get(1), args.get(2..).filter(|v| !v.is_empty())) else {
            return self
                .reply(msg, &texts::addrule_usage(prefix, "category or value was missing"))
                .await;
        };
        let sign = match sign_word.to_ascii_lowercase().as_str() {
            "include" => Sign::Include,
            "exclude" => Sign::Exclude,
            _ => {
                return self
                    .reply(msg, &texts::addrule_usage(prefix, "first argument was not include or exclude"))
                    .await;
            }
        };
        let Ok(category) = category_name.parse::<Category>() else {
            return self.reply(msg, &texts::category_not_found(category_name)).await;
        };

        let token = if category.is_named() {
            match self.credential(msg.author).await? {
                Some(token) => Some(token),
                None => return Ok(()),
            }
        } else {
            None
        };

        for value in values {
            let (stored, display) = match &token {
                Some(token) => match self.lookup(value, token).await {
                    Ok(Some(user)) => (user.id, user.username),
                    Ok(None) => return self.reply(msg, &texts::user_not_found(value)).await,
                    Err(e) => {
                        warn!(user_id = %msg.author, error = %e, "username lookup failed");
                        return self.retry_later(msg, "addrule").await;
                    }
                },
                None => (value.clone(), value.clone()),
            };

            {
                let mut registry = self.registry.lock().await;
                let Some(user) = registry.find_mut(msg.author) else {
                    return Ok(());
                };
                if user.rules.entry(category).insert(sign.key(&stored), &display) {
                    registry.mark_dirty();
                }
            }
            info!(user_id = %msg.author, category = %category, "rule added");
            self.reply(msg, &texts::rule_added(category.name(), value)).await?;
        }
        Ok(())
    }

    async fn remove_rule(&self, msg: &InboundMessage, values: &[String]) -> Result<(), RelayError> {
        if values.is_empty() {
            return self.reply(msg, &texts::removerule_usage(&self.settings.prefix)).await;
        }

        let mut token = None;
        for value in values {
            let categories: Vec<Category> = {
                let registry = self.registry.lock().await;
                let Some(user) = registry.find(msg.author) else {
                    return Ok(());
                };
                user.rules.iter().map(|r| r.category).collect()
            };

            let mut found = false;
            for category in categories {
                let id = if category.is_named() {
                    match self.actor_key(msg.author, value, &mut token).await {
                        Ok(id) => id,
                        Err(e) => {
                            warn!(user_id = %msg.author, error = %e, "username lookup failed");
                            return self.retry_later(msg, "removerule").await;
                        }
                    }
                } else {
                    value.clone()
                };

                let removed = {
                    let mut registry = self.registry.lock().await;
                    let Some(selectors) = registry
                        .find_mut(msg.author)
                        .and_then(|u| u.rules.get_mut(category))
                    else {
                        continue;
                    };
                    let hit = [Sign::Include.key(&id), Sign::Exclude.key(&id), id]
                        .iter()
                        .any(|key| selectors.remove(key));
                    if hit {
                        registry.mark_dirty();
                    }
                    hit
                };
                if removed {
                    found = true;
                    info!(user_id = %msg.author, category = %category, "rule removed");
                    self.reply(msg, &texts::rule_removed(value, category.name())).await?;
                }
            }
            if !found {
                self.reply(msg, &texts::rule_not_found(value)).await?;
            }
        }
        Ok(())
    }

    /// Stored actor id for `value`: a cached username first, then a lookup,
    /// then the raw value.
    async fn actor_key(
        &self,
        author: UserId,
        value: &str,
        token: &mut Option<SecretString>,
    ) -> Result<String, RelayError> {
        let (cached, empty) = {
            let registry = self.registry.lock().await;
            match registry.find(author).and_then(|u| u.rules.get(Category::Actor)) {
                Some(selectors) => (
                    selectors
                        .key_for_name(value)
                        .map(|k| k.trim_start_matches(|c: char| c == '+' || c == '-').to_string()),
                    selectors.is_empty(),
                ),
                None => (None, true),
            }
        };
        if let Some(id) = cached {
            return Ok(id);
        }
        if empty {
            return Ok(value.to_string());
        }
        if token.is_none() {
            *token = self.credential(author).await?;
        }
        let Some(secret) = token.as_ref() else {
            return Ok(value.to_string());
        };
        Ok(match self.lookup(value, secret).await? {
            Some(user) => user.id,
            None => value.to_string(),
        })
    }

    async fn toggle_override(&self, msg: &InboundMessage) -> Result<(), RelayError> {
        let enabled = {
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(msg.author) else {
                return Ok(());
            };
            user.override_rules = !user.override_rules;
            let enabled = user.override_rules;
            registry.mark_dirty();
            enabled
        };
        info!(user_id = %msg.author, enabled, "override toggled");
        self.reply(msg, &texts::override_toggled(enabled, &self.settings.prefix))
            .await
    }

    /// Pausing is immediate. Unpausing re-seeds the cursor from a fresh page
    /// so events from the paused period are not replayed.
    async fn toggle_pause(&self, msg: &InboundMessage) -> Result<(), RelayError> {
        let prefix = self.settings.prefix.as_str();
        let was_paused = {
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(msg.author) else {
                return Ok(());
            };
            let was_paused = user.paused;
            if !was_paused {
                user.paused = true;
                registry.mark_dirty();
            }
            was_paused
        };
        if !was_paused {
            info!(user_id = %msg.author, "user paused");
            return self.reply(msg, &texts::paused(prefix)).await;
        }

        let Some(token) = self.credential(msg.author).await? else {
            return Ok(());
        };
        let page = self.feed.fetch(&token).await;
        let resumed = {
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(msg.author) else {
                return Ok(());
            };
            match page {
                Ok(page) if !page.is_empty() => {
                    user.processed_ids.seed(&page);
                    user.paused = false;
                    registry.mark_dirty();
                    true
                }
                outcome => {
                    if let Err(e) = outcome {
                        warn!(user_id = %msg.author, error = %e, "feed check failed on unpause");
                    }
                    false
                }
            }
        };
        if resumed {
            info!(user_id = %msg.author, "user unpaused");
            self.reply(msg, &texts::unpaused(prefix)).await
        } else {
            self.reply(msg, &notices::check_failed(prefix)).await
        }
    }

    async fn send_here(&self, msg: &InboundMessage, args: &[String]) -> Result<(), RelayError> {
        let prefix = self.settings.prefix.as_str();
        let disabled = {
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(msg.author) else {
                return Ok(());
            };
            if user.destination.is_channel() {
                user.destination = Destination::Direct;
                user.handles.channel = None;
                registry.mark_dirty();
                true
            } else {
                false
            }
        };
        if disabled {
            info!(user_id = %msg.author, "destination reset to direct messages");
            return self.reply(msg, texts::sendhere_disabled()).await;
        }

        if msg.private {
            return self.reply(msg, texts::sendhere_not_in_dm()).await;
        }
        let mention = match args.first().map(|f| f.to_ascii_lowercase()).as_deref() {
            Some("mention") => true,
            Some("nomention") => false,
            _ => return self.reply(msg, &texts::sendhere_usage(prefix)).await,
        };
        if !self.confirm(msg, texts::sendhere_prompt(), "sendhere").await? {
            return Ok(());
        }

        let channel = msg.conversation;
        let probe = async {
            let target = self.chat.open_channel(channel).await?;
            self.chat.send(&target, &texts::sendhere_enabled(prefix)).await?;
            Ok::<_, RelayError>(target)
        };
        match probe.await {
            Ok(target) => {
                let mut registry = self.registry.lock().await;
                let Some(user) = registry.find_mut(msg.author) else {
                    return Ok(());
                };
                user.destination = Destination::Channel {
                    channel_id: channel,
                    mention,
                };
                user.handles.channel = Some(target);
                registry.mark_dirty();
                info!(user_id = %msg.author, channel_id = %channel, mention, "destination set to channel");
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %msg.author, channel_id = %channel, error = %e, "could not post to channel");
                self.retry_later(msg, "sendhere").await
            }
        }
    }

    async fn unregister(&self, msg: &InboundMessage) -> Result<(), RelayError> {
        if !self.confirm(msg, texts::unregister_prompt(), "unregister").await? {
            return Ok(());
        }
        let removed = self.registry.lock().await.remove(msg.author).is_some();
        if !removed {
            return Ok(());
        }
        info!(user_id = %msg.author, "user unregistered");
        self.reply(msg, &texts::unregistered(&self.settings.prefix)).await
    }

    async fn update_token(&self, msg: &InboundMessage, args: &[String]) -> Result<(), RelayError> {
        if !msg.private {
            return self
                .reply(msg, &texts::dm_only(&self.settings.prefix, "updatetoken"))
                .await;
        }
        let Some(token) = args.first() else {
            return self.reply(msg, texts::updatetoken_missing()).await;
        };
        let token = SecretString::from(token.clone());
        if !self.confirm(msg, texts::updatetoken_prompt(), "updatetoken").await? {
            return Ok(());
        }

        let page = match self.feed.fetch(&token).await {
            Ok(page) => page,
            Err(e) => {
                warn!(user_id = %msg.author, error = %e, "token check failed during update");
                return self.retry_later(msg, "updatetoken").await;
            }
        };
        if page.is_empty() {
            return self.reply(msg, texts::invalid_token()).await;
        }
        let sealed = self.vault.seal(&token)?;
        {
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(msg.author) else {
                return Ok(());
            };
            user.credential = sealed;
            user.processed_ids.seed(&page);
            registry.mark_dirty();
        }
        info!(user_id = %msg.author, seeded = page.len(), "token updated");
        self.reply(msg, texts::token_updated()).await
    }

    /// Sends the rule summary to the author's direct messages.
    async fn show_rules(&self, msg: &InboundMessage) -> Result<(), RelayError> {
        let text = {
            let registry = self.registry.lock().await;
            let Some(user) = registry.find(msg.author) else {
                return Ok(());
            };
            describe_rules(user, &self.settings.prefix)?
        };
        let target = self.chat.open_direct(msg.author).await?;
        self.chat.send(&target, &text).await
    }

    /// Asks `question` and waits for the author's answer. On anything but
    /// `Y`, replies with the cancellation notice and returns false.
    async fn confirm(&self, msg: &InboundMessage, question: &str, command: &str) -> Result<bool, RelayError> {
        let pending = self.waiter.expect_reply(msg.author, msg.conversation);
        if let Err(e) = self.reply(msg, question).await {
            self.waiter.abandon(pending);
            return Err(e);
        }
        match self.waiter.wait(pending).await {
            Confirmation::Accepted => Ok(true),
            Confirmation::Declined => {
                self.reply(msg, &texts::cancelled_declined(command)).await?;
                Ok(false)
            }
            Confirmation::TimedOut => {
                let secs = self.waiter.timeout().as_secs();
                self.reply(msg, &texts::cancelled_timeout(command, secs)).await?;
                Ok(false)
            }
        }
    }

    async fn credential(&self, id: UserId) -> Result<Option<SecretString>, RelayError> {
        let sealed = {
            let registry = self.registry.lock().await;
            registry.find(id).map(|u| u.credential.clone())
        };
        sealed.map(|s| self.vault.open(&s)).transpose()
    }

    async fn lookup(&self, username: &str, token: &SecretString) -> Result<Option<FeedUser>, RelayError> {
        let found = self.feed.lookup_user(username, token).await;
        tokio::time::sleep(self.settings.lookup_delay).await;
        found
    }

    async fn reply(&self, msg: &InboundMessage, text: &str) -> Result<(), RelayError> {
        self.chat.send(&ChatTarget::reply_to(msg), text).await
    }

    async fn retry_later(&self, msg: &InboundMessage, command: &str) -> Result<(), RelayError> {
        self.reply(msg, &texts::retry_later(command, &self.settings.support_url))
            .await
    }
}

/// Rule summary: pretty JSON of display selectors plus state lines.
fn describe_rules(user: &UserRecord, prefix: &str) -> Result<String, RelayError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    (&mut ser)
        .collect_map(user.rules.iter().map(|r| (r.category.name(), r.selectors.describe())))
        .map_err(|e| RelayError::Internal(format!("rule summary: {e}")))?;
    let json = String::from_utf8(buf).map_err(|e| RelayError::Internal(format!("rule summary: {e}")))?;

    let mut text = format!("Rules: {}", escape_markdown(&json));
    if user.override_rules {
        text.push_str(&format!("\nOverride is currently enabled (disable by using {prefix} override)"));
    }
    if user.paused {
        text.push_str(&format!("\nNotifications are currently paused (unpause by using {prefix} pause)"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrelay_core::{SealedCredential, UserId};

    #[test]
    fn settings_follow_config() {
        let settings = CommandSettings::from(&RelayConfig::default());
        assert_eq!(settings.prefix, "!flatnotifs");
        assert_eq!(settings.confirm_timeout, Duration::from_secs(30));
        assert_eq!(settings.lookup_delay, Duration::from_secs(1));
        assert_eq!(settings.cursor_capacity, 100);
    }

    #[test]
    fn rule_summary_shows_usernames_and_state() {
        let mut user = UserRecord::new(UserId(1), SealedCredential("x".into()), 10);
        user.rules.entry(Category::Actor).insert("+42".into(), "flat");
        user.rules.entry(Category::Type).insert("-scoreStar".into(), "");
        user.paused = true;

        let text = describe_rules(&user, "!flatnotifs").unwrap();
        assert!(text.starts_with("Rules: {"));
        assert!(text.contains("\"actor\\.username\": \\[\n        \"\\+flat\""));
        assert!(text.contains("\"\\-scoreStar\""));
        assert!(!text.contains("42"));
        assert!(text.ends_with("(unpause by using !flatnotifs pause)"));
        assert!(!text.contains("Override"));
    }
}
