// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message pump.
//!
//! Every message is first offered to pending confirmation prompts. Anything
//! not consumed there runs as a command on its own task, so a handler waiting
//! for a reply never blocks the pump that delivers that reply.
//!
//! Command tasks are tracked. Once the pump stops reading it waits up to
//! `drain` for running commands to finish, so their registry changes are
//! in place before the final flush.

use std::sync::Arc;
use std::time::Duration;

use flatrelay_commands::CommandHandler;
use flatrelay_core::ChatAdapter;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Reads inbound messages until `cancel` fires or the chat stream ends,
/// then drains in-flight commands for at most `drain`.
pub async fn run_pump(
    chat: Arc<dyn ChatAdapter>,
    handler: Arc<CommandHandler>,
    cancel: CancellationToken,
    drain: Duration,
) {
    let tracker = TaskTracker::new();
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => {
                info!("command pump shutting down");
                break;
            }
            received = chat.receive() => match received {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "inbound stream ended");
                    break;
                }
            },
        };

        if handler.waiter().offer(&msg) {
            debug!(user_id = %msg.author, "reply routed to pending confirmation");
            continue;
        }

        let handler = handler.clone();
        tracker.spawn(async move {
            if let Err(e) = handler.handle(&msg).await {
                warn!(user_id = %msg.author, error = %e, "command failed");
            }
        });
    }

    tracker.close();
    if !tracker.is_empty() {
        info!(running = tracker.len(), "waiting for in-flight commands");
    }
    if tokio::time::timeout(drain, tracker.wait()).await.is_err() {
        warn!(running = tracker.len(), "in-flight commands did not finish before shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flatrelay_commands::{Confirmation, CommandSettings};
    use flatrelay_core::{Category, ChannelId, UserId, UserStore};
    use flatrelay_poller::final_flush;
    use flatrelay_registry::{shared, Registry, SharedRegistry};
    use flatrelay_test_utils::{
        direct_message, test_vault, MemoryStore, MockChat, ScriptedFeed, UserBuilder,
    };
    use tracing_test::traced_test;

    const DRAIN: Duration = Duration::from_secs(5);

    fn settings(lookup_delay: Duration) -> CommandSettings {
        CommandSettings {
            prefix: "!flatnotifs".into(),
            support_url: "https://discord.gg/example".into(),
            confirm_timeout: Duration::from_secs(30),
            lookup_delay,
            cursor_capacity: 100,
        }
    }

    fn handler_with(
        chat: Arc<MockChat>,
        registry: SharedRegistry,
        feed: ScriptedFeed,
        lookup_delay: Duration,
    ) -> Arc<CommandHandler> {
        Arc::new(CommandHandler::new(
            registry,
            Arc::new(feed),
            Arc::new(test_vault()),
            chat,
            settings(lookup_delay),
        ))
    }

    fn handler(chat: Arc<MockChat>, registry: Registry) -> Arc<CommandHandler> {
        handler_with(chat, shared(registry), ScriptedFeed::new(), Duration::from_secs(1))
    }

    async fn wait_for_sends(chat: &MockChat, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while chat.sent_count().await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("expected messages were not sent");
    }

    #[tokio::test]
    async fn commands_are_dispatched() {
        let chat = Arc::new(MockChat::new());
        let handler = handler(chat.clone(), Registry::new());
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(chat.clone(), handler, cancel.clone(), DRAIN));

        chat.inject_message(direct_message(UserId(4), "!flatnotifs help")).await;
        wait_for_sends(&chat, 1).await;
        assert!(chat.direct_messages(UserId(4)).await[0].starts_with("Welcome"));

        cancel.cancel();
        pump.await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn replies_go_to_the_pending_prompt() {
        let chat = Arc::new(MockChat::new());
        let users = vec![UserBuilder::new(5).build()];
        let handler = handler(chat.clone(), Registry::from_records(users, 100));
        let pending = handler.waiter().expect_reply(UserId(5), ChannelId(5));
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(chat.clone(), handler.clone(), cancel.clone(), DRAIN));

        chat.inject_message(direct_message(UserId(5), "Y")).await;
        assert_eq!(handler.waiter().wait(pending).await, Confirmation::Accepted);
        assert_eq!(chat.sent_count().await, 0);
        assert!(logs_contain("reply routed to pending confirmation"));

        cancel.cancel();
        pump.await.unwrap();
    }

    #[tokio::test]
    async fn pump_stops_on_cancel_without_traffic() {
        let chat = Arc::new(MockChat::new());
        let handler = handler(chat.clone(), Registry::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), run_pump(chat, handler, cancel, DRAIN))
            .await
            .expect("pump should stop");
    }

    #[tokio::test]
    async fn running_commands_finish_before_the_final_flush() {
        let chat = Arc::new(MockChat::new());
        let feed = ScriptedFeed::new();
        feed.add_user("42", "flat").await;
        let registry = shared(Registry::from_records(vec![UserBuilder::new(5).build()], 100));
        let store: Arc<dyn UserStore> = Arc::new(MemoryStore::new());
        let handler = handler_with(chat.clone(), registry.clone(), feed.clone(), Duration::from_millis(300));
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(chat.clone(), handler, cancel.clone(), DRAIN));

        chat.inject_message(direct_message(UserId(5), "!flatnotifs addrule exclude actor.username flat"))
            .await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while feed.lookup_count().await == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("lookup should start");

        // Shut down while the command sits in its lookup pause.
        cancel.cancel();
        pump.await.unwrap();
        final_flush(&registry, &store).await.unwrap();

        assert!(!registry.lock().await.is_dirty());
        let saved = store.load_all().await.unwrap();
        let actors = saved[0].rules.get(Category::Actor).unwrap();
        assert_eq!(actors.keys(), vec!["-42"]);
        assert!(chat.direct_messages(UserId(5)).await[0].contains("added"));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_is_bounded() {
        let chat = Arc::new(MockChat::new());
        let handler = handler(chat.clone(), Registry::from_records(vec![UserBuilder::new(5).build()], 100));
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(run_pump(chat.clone(), handler.clone(), cancel.clone(), Duration::from_secs(2)));

        // Unregister waits 30s for a confirmation that never comes.
        chat.inject_message(direct_message(UserId(5), "!flatnotifs unregister")).await;
        while handler.waiter().pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        let started = tokio::time::Instant::now();
        cancel.cancel();
        pump.await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
