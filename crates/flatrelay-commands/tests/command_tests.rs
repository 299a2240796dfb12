// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command handler behaviour against mock chat, scripted feed and registry.

use std::sync::Arc;
use std::time::Duration;

use flatrelay_commands::{CommandHandler, CommandSettings};
use flatrelay_core::{
    Category, ChannelId, CredentialVault, Destination, InboundMessage, RelayError, Sign, UserId,
    UserRecord,
};
use flatrelay_registry::{shared, Registry, SharedRegistry};
use flatrelay_test_utils::{
    channel_message, direct_message, page, test_vault, FeedOutcome, MockChat, ScriptedFeed,
    UserBuilder,
};
use secrecy::ExposeSecret;

struct Harness {
    chat: Arc<MockChat>,
    feed: ScriptedFeed,
    registry: SharedRegistry,
    handler: Arc<CommandHandler>,
}

fn harness(users: Vec<UserRecord>) -> Harness {
    let chat = Arc::new(MockChat::new());
    let feed = ScriptedFeed::new();
    let registry = shared(Registry::from_records(users, 100));
    let settings = CommandSettings {
        prefix: "!flatnotifs".into(),
        support_url: "https://discord.gg/example".into(),
        confirm_timeout: Duration::from_secs(30),
        lookup_delay: Duration::from_secs(1),
        cursor_capacity: 100,
    };
    let handler = Arc::new(CommandHandler::new(
        registry.clone(),
        Arc::new(feed.clone()),
        Arc::new(test_vault()),
        chat.clone(),
        settings,
    ));
    Harness {
        chat,
        feed,
        registry,
        handler,
    }
}

impl Harness {
    async fn send(&self, msg: InboundMessage) {
        self.handler.handle(&msg).await.unwrap();
    }

    /// Runs a confirming command, answering its prompt with `answer`.
    async fn send_confirmed(&self, msg: InboundMessage, answer: &str) {
        let handler = self.handler.clone();
        let reply = InboundMessage {
            content: answer.to_string(),
            ..msg.clone()
        };
        let task = tokio::spawn(async move { handler.handle(&msg).await });
        while self.handler.waiter().pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(self.handler.waiter().offer(&reply));
        task.await.unwrap().unwrap();
    }

    async fn user(&self, id: u64) -> Option<UserRecord> {
        self.registry.lock().await.find(UserId(id)).cloned()
    }

    async fn last_dm(&self, id: u64) -> String {
        self.chat
            .direct_messages(UserId(id))
            .await
            .pop()
            .unwrap_or_default()
    }
}

fn cursor(user: &UserRecord) -> Vec<String> {
    user.processed_ids.iter().map(|i| i.0.clone()).collect()
}

const ALICE: UserId = UserId(1);
const GUILD_CHANNEL: ChannelId = ChannelId(900);

#[tokio::test]
async fn unregistered_users_get_the_welcome_text() {
    let h = harness(vec![]);
    h.send(direct_message(ALICE, "!flatnotifs help")).await;
    h.send(direct_message(ALICE, "!flatnotifs getstarted")).await;
    let dms = h.chat.direct_messages(ALICE).await;
    assert_eq!(dms.len(), 2);
    assert!(dms.iter().all(|m| m.starts_with("Welcome to Flat.io Notifs!")));
}

#[tokio::test]
async fn unprefixed_messages_are_ignored() {
    let h = harness(vec![]);
    h.send(direct_message(ALICE, "hello bot")).await;
    assert_eq!(h.chat.sent_count().await, 0);
}

#[tokio::test]
async fn getstarted_is_refused_outside_direct_messages() {
    let h = harness(vec![]);
    h.send(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs getstarted tok")).await;
    assert_eq!(
        h.chat.sent_to(GUILD_CHANNEL).await,
        ["`!flatnotifs getstarted`  must be used in DMs!"]
    );
    assert_eq!(h.feed.total_fetches().await, 0);
}

#[tokio::test]
async fn getstarted_registers_with_a_seeded_cursor() {
    let h = harness(vec![]);
    h.feed.set_page("tok", page(&["3", "2", "1"])).await;

    h.send(direct_message(ALICE, "!flatnotifs GetStarted tok")).await;

    let user = h.user(1).await.expect("registered");
    assert_eq!(cursor(&user), ["1", "2", "3"]);
    assert!(!user.paused);
    assert_eq!(user.destination, Destination::Direct);
    assert_eq!(test_vault().open(&user.credential).unwrap().expose_secret(), "tok");
    assert_ne!(user.credential.0, "tok");
    assert!(h.registry.lock().await.is_dirty());
    assert!(h.last_dm(1).await.starts_with("Successfully registered!"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_getstarted_registers_once_and_answers_both() {
    let h = harness(vec![]);
    h.feed.set_page("tok", page(&["2", "1"])).await;
    h.feed.set_fetch_delay(Duration::from_millis(100)).await;

    let msg = direct_message(ALICE, "!flatnotifs getstarted tok");
    let (first, second) = tokio::join!(h.handler.handle(&msg), h.handler.handle(&msg));
    first.unwrap();
    second.unwrap();

    assert_eq!(h.feed.fetch_count("tok").await, 2);
    assert_eq!(h.registry.lock().await.len(), 1);
    let replies = h.chat.direct_messages(ALICE).await;
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().any(|r| r.starts_with("Successfully registered!")));
    assert!(replies.iter().any(|r| r.starts_with("Whoops! That command was invalid.")));
}

#[tokio::test]
async fn getstarted_rejects_tokens_that_read_nothing() {
    let h = harness(vec![]);
    h.send(direct_message(ALICE, "!flatnotifs getstarted bad")).await;
    assert!(h.user(1).await.is_none());
    assert!(h.last_dm(1).await.contains("provide a valid personal token"));
}

#[tokio::test]
async fn getstarted_hard_failure_asks_to_retry() {
    let h = harness(vec![]);
    h.feed.push("tok", FeedOutcome::HardFailure).await;
    h.send(direct_message(ALICE, "!flatnotifs getstarted tok")).await;
    assert!(h.user(1).await.is_none());
    assert!(h.last_dm(1).await.starts_with("Uh oh, there was an error during registration."));
}

#[tokio::test]
async fn greeting_and_unknown_commands() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs")).await;
    h.send(direct_message(ALICE, "!flatnotifs subscribe")).await;
    let dms = h.chat.direct_messages(ALICE).await;
    assert!(dms[0].starts_with("Hello to you too! <3"));
    assert!(dms[1].starts_with("Whoops! That command was invalid."));
}

#[tokio::test]
async fn addrule_validates_its_arguments() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs addrule")).await;
    h.send(direct_message(ALICE, "!flatnotifs addrule include type")).await;
    h.send(direct_message(ALICE, "!flatnotifs addrule maybe type userFollow")).await;
    h.send(direct_message(ALICE, "!flatnotifs addrule include colour red")).await;
    let dms = h.chat.direct_messages(ALICE).await;
    assert!(dms[0].ends_with("(include/exclude was missing)"));
    assert!(dms[1].ends_with("(category or value was missing)"));
    assert!(dms[2].ends_with("(first argument was not include or exclude)"));
    assert_eq!(dms[3], "Category colour not found");
    assert!(!h.registry.lock().await.is_dirty());
}

#[tokio::test]
async fn addrule_stores_signed_values() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs addrule include type userFollow scoreStar")).await;
    h.send(direct_message(ALICE, "!flatnotifs addrule exclude attachments.score.id s9")).await;

    let user = h.user(1).await.unwrap();
    assert_eq!(user.rules.get(Category::Type).unwrap().keys(), ["+userFollow", "+scoreStar"]);
    assert_eq!(user.rules.get(Category::Score).unwrap().keys(), ["-s9"]);
    let dms = h.chat.direct_messages(ALICE).await;
    assert_eq!(dms[0], "Rule type: userFollow added");
    assert_eq!(dms[2], "Rule attachments\\.score\\.id: s9 added");
}

#[tokio::test(start_paused = true)]
async fn addrule_resolves_usernames_to_ids() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.feed.add_user("42", "flat").await;

    h.send(direct_message(ALICE, "!flatnotifs addrule exclude actor.username flat")).await;

    let user = h.user(1).await.unwrap();
    let actors = user.rules.get(Category::Actor).unwrap();
    assert_eq!(actors.keys(), ["-42"]);
    assert_eq!(actors.display_name("-42"), Some("flat"));
    assert_eq!(h.feed.lookup_count().await, 1);
    assert_eq!(h.last_dm(1).await, "Rule actor\\.username: flat added");
}

#[tokio::test(start_paused = true)]
async fn addrule_stops_at_unknown_username() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.feed.add_user("42", "flat").await;

    h.send(direct_message(ALICE, "!flatnotifs addrule include actor.username ghost flat")).await;

    assert!(h.user(1).await.unwrap().rules.get(Category::Actor).unwrap().is_empty());
    assert_eq!(h.chat.direct_messages(ALICE).await.len(), 1);
    assert!(h.last_dm(1).await.starts_with("User not found with username ghost."));
}

#[tokio::test(start_paused = true)]
async fn addrule_lookup_failure_asks_to_retry() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.feed.fail_lookups().await;
    h.send(direct_message(ALICE, "!flatnotifs addrule include actor.username flat")).await;
    assert!(h.last_dm(1).await.starts_with("Uh oh, there was an error during addrule."));
}

#[tokio::test(start_paused = true)]
async fn removerule_matches_cached_usernames_without_lookup() {
    let h = harness(vec![UserBuilder::new(1)
        .actor(Sign::Include, "42", "flat")
        .actor(Sign::Exclude, "7", "other")
        .include(Category::Type, "userFollow")
        .build()]);

    h.send(direct_message(ALICE, "!flatnotifs removerule flat userFollow missing")).await;

    let user = h.user(1).await.unwrap();
    assert_eq!(user.rules.get(Category::Actor).unwrap().keys(), ["-7"]);
    assert!(user.rules.get(Category::Type).unwrap().is_empty());
    // `flat` is cached; `userFollow` and `missing` each cost one lookup.
    assert_eq!(h.feed.lookup_count().await, 2);
    let dms = h.chat.direct_messages(ALICE).await;
    assert_eq!(dms[0], "Rule flat removed from actor\\.username");
    assert_eq!(dms[1], "Rule userFollow removed from type");
    assert_eq!(dms[2], "Rule missing not found");
}

#[tokio::test]
async fn removerule_requires_a_value() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs removerule")).await;
    assert!(h.last_dm(1).await.contains("`!flatnotifs removerule value`"));
}

#[tokio::test]
async fn override_toggles() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs override")).await;
    assert!(h.user(1).await.unwrap().override_rules);
    assert!(h.last_dm(1).await.starts_with("Override enabled"));
    h.send(direct_message(ALICE, "!flatnotifs override")).await;
    assert!(!h.user(1).await.unwrap().override_rules);
    assert!(h.last_dm(1).await.starts_with("Override disabled"));
}

#[tokio::test]
async fn unpause_reseeds_the_cursor() {
    let h = harness(vec![UserBuilder::new(1).processed(&["1"]).build()]);
    h.send(direct_message(ALICE, "!flatnotifs pause")).await;
    assert!(h.user(1).await.unwrap().paused);
    assert!(h.last_dm(1).await.starts_with("Notifications paused"));

    h.feed.set_page("token-1", page(&["9", "8"])).await;
    h.send(direct_message(ALICE, "!flatnotifs pause")).await;
    let user = h.user(1).await.unwrap();
    assert!(!user.paused);
    assert_eq!(cursor(&user), ["8", "9"]);
    assert!(h.last_dm(1).await.starts_with("Notifications unpaused"));
}

#[tokio::test]
async fn unpause_with_unreadable_feed_stays_paused() {
    let h = harness(vec![UserBuilder::new(1).paused().processed(&["1"]).build()]);
    h.send(direct_message(ALICE, "!flatnotifs pause")).await;
    let user = h.user(1).await.unwrap();
    assert!(user.paused);
    assert_eq!(cursor(&user), ["1"]);
    assert!(h.last_dm(1).await.contains("Unable to check your notifications!"));
}

#[tokio::test]
async fn sendhere_needs_a_shared_channel_and_a_flag() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs sendhere mention")).await;
    assert_eq!(h.last_dm(1).await, "sendhere can only be set in non-DM channels.");
    h.send(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs sendhere loud")).await;
    assert!(h.chat.sent_to(GUILD_CHANNEL).await[0].contains("mention/nomention"));
    assert_eq!(h.handler.waiter().pending_count(), 0);
}

#[tokio::test]
async fn sendhere_confirmed_switches_to_the_channel() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send_confirmed(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs sendhere Mention"), "y")
        .await;

    let user = h.user(1).await.unwrap();
    assert_eq!(
        user.destination,
        Destination::Channel {
            channel_id: GUILD_CHANNEL,
            mention: true
        }
    );
    assert_eq!(user.handles.channel.map(|t| t.channel), Some(GUILD_CHANNEL));
    let posted = h.chat.sent_to(GUILD_CHANNEL).await;
    assert!(posted[0].starts_with("Are you sure"));
    assert!(posted[1].starts_with("Successfully changed your notification channel to this channel."));

    h.send(direct_message(ALICE, "!flatnotifs sendhere")).await;
    assert_eq!(h.user(1).await.unwrap().destination, Destination::Direct);
    assert!(h.last_dm(1).await.contains("back to default"));
}

#[tokio::test]
async fn sendhere_unpostable_channel_is_not_committed() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    let prompt_only = ChannelId(901);
    h.chat.fail_channel(prompt_only).await;
    let task = {
        let handler = h.handler.clone();
        tokio::spawn(async move {
            handler
                .handle(&channel_message(ALICE, prompt_only, "!flatnotifs sendhere nomention"))
                .await
        })
    };
    // The question itself cannot be posted, so the command fails without waiting.
    let result = task.await.unwrap();
    assert!(matches!(result, Err(RelayError::Chat { .. })));
    assert_eq!(h.handler.waiter().pending_count(), 0);
    assert_eq!(h.user(1).await.unwrap().destination, Destination::Direct);
}

#[tokio::test(start_paused = true)]
async fn sendhere_times_out() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs sendhere nomention")).await;
    let posted = h.chat.sent_to(GUILD_CHANNEL).await;
    assert_eq!(posted[1], "Cancelling sendhere (no response for 30 sec)");
    assert_eq!(h.user(1).await.unwrap().destination, Destination::Direct);
}

#[tokio::test]
async fn unregister_requires_yes() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send_confirmed(direct_message(ALICE, "!flatnotifs unregister"), "no").await;
    assert!(h.user(1).await.is_some());
    assert_eq!(
        h.last_dm(1).await,
        "Cancelling unregister (received a response other than 'Y')"
    );

    h.send_confirmed(direct_message(ALICE, "!flatnotifs unregister"), "Y").await;
    assert!(h.user(1).await.is_none());
    assert!(h.registry.lock().await.is_dirty());
    assert!(h.last_dm(1).await.starts_with("Successfully unregistered."));
}

#[tokio::test]
async fn updatetoken_replaces_credential_and_cursor() {
    let h = harness(vec![UserBuilder::new(1).processed(&["1"]).build()]);
    h.feed.set_page("fresh", page(&["b", "a"])).await;

    h.send_confirmed(direct_message(ALICE, "!flatnotifs updatetoken fresh"), "Y").await;

    let user = h.user(1).await.unwrap();
    assert_eq!(test_vault().open(&user.credential).unwrap().expose_secret(), "fresh");
    assert_eq!(cursor(&user), ["a", "b"]);
    assert_eq!(h.last_dm(1).await, "Successfully updated your personal token!");
}

#[tokio::test]
async fn updatetoken_is_dm_only_and_needs_a_token() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs updatetoken x")).await;
    assert_eq!(
        h.chat.sent_to(GUILD_CHANNEL).await,
        ["`!flatnotifs updatetoken`  must be used in DMs!"]
    );
    h.send(direct_message(ALICE, "!flatnotifs updatetoken")).await;
    assert_eq!(h.last_dm(1).await, "Please provide your new personal token.");
}

#[tokio::test]
async fn updatetoken_keeps_old_token_when_new_one_is_invalid() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send_confirmed(direct_message(ALICE, "!flatnotifs updatetoken empty"), "Y").await;
    let user = h.user(1).await.unwrap();
    assert_eq!(test_vault().open(&user.credential).unwrap().expose_secret(), "token-1");
    assert!(h.last_dm(1).await.contains("provide a valid personal token"));
}

#[tokio::test]
async fn rules_go_to_direct_messages() {
    let h = harness(vec![UserBuilder::new(1)
        .include(Category::Type, "userFollow")
        .override_rules()
        .build()]);
    h.send(channel_message(ALICE, GUILD_CHANNEL, "!flatnotifs rules")).await;
    assert!(h.chat.sent_to(GUILD_CHANNEL).await.is_empty());
    let summary = h.last_dm(1).await;
    assert!(summary.starts_with("Rules: {"));
    assert!(summary.contains("\\+userFollow"));
    assert!(summary.contains("Override is currently enabled"));
}

#[tokio::test]
async fn help_is_sent_in_two_parts() {
    let h = harness(vec![UserBuilder::new(1).build()]);
    h.send(direct_message(ALICE, "!flatnotifs help")).await;
    let dms = h.chat.direct_messages(ALICE).await;
    assert_eq!(dms.len(), 2);
    assert!(dms[0].starts_with("**Help**"));
    assert!(dms[1].starts_with("**Available commands:**"));
}
