// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts.

use flatrelay_rules::escape_markdown as esc;

/// Answer to anything an unregistered user sends, except `getstarted`.
pub fn welcome(prefix: &str, support_url: &str) -> String {
    format!(
        "Welcome to Flat.io Notifs! Please provide a personal token in this format:  `{prefix} getstarted token`  (where token is your personal token).\n\
         To get a personal token: 1. Go to the [Flat.io Developers portal](https://flat.io/developers/apps), 2. Create a new app if you don't have one already, \
         3. Go to Personal Tokens, 4. Create a new token and add the notifications.readonly scope, 5. Copy the token that appears.\n\
         Note that getstarted can only be used in DMs. Remember to never send your personal token in a public channel! \
         It can give other people access to your account's information. If you exposed your personal token, go delete it in the \
         [Flat.io Developers portal](https://flat.io/developers/apps) and create a new one.\n\
         *(Need help? Join the bot's [Discord server](<{support_url}>)!)*"
    )
}

/// Help, split in two messages to stay under the platform length limit.
pub fn help(prefix: &str, support_url: &str) -> [String; 2] {
    let intro = "**Help**\n\n\
        Welcome to Flat Notifs! This a bot that sends your Flat notifications directly to your Discord DMs or a channel in a server \
        that you specify (that this bot has been added to)! In addition, it allows you to filter by user, notification type, and score id."
        .to_string();
    let commands = format!(
        "**Available commands:**\n\
         `{prefix} addrule include/exclude category value`  (Add a rule. More than one value can be specified, separated by spaces)\n\
         `{prefix} removerule value`  (Remove a rule. More than one value can be specified, separated by spaces)\n\
         `{prefix} override`  (Override the rules you have set. The bot will notify you of all notifications. Use the same command to toggle on and off)\n\
         `{prefix} pause`  (Pause notifications. The bot will not notify you of any notifications. Use the same command to toggle on and off)\n\
         `{prefix} sendhere mention/nomention`  (Set your notifications to send in the channel where the command was sent. \
         Use the same command to toggle on and off. When toggling on, specify whether you want to be @ mentioned)\n\
         `{prefix} unregister`  (Unregister and delete all of your information including your personal token, rules, and other preferences)\n\
         `{prefix} updatetoken token`  (Update your personal token)\n\
         `{prefix} rules`  (Show all rules you have set)\n\
         `{prefix} version`  (Show patch notes for the current and previous version)\n\
         `{prefix} help`  (You are here!)\n\n\
         **Available categories/values (for addrule and removerule):**\n\
         `actor.username`  (Flat.io username, without the @ sign. e.g. `actor.username flat`)\n\
         `type`  (Type of notification. Options: scorePublish, scoreComment, scoreStar, userFollow. e.g. `type userFollow`)\n\
         `attachments.score.id`  (id of a score, without the name. e.g. `attachments.score.id 623f2fab79ac0e0012b95dc8`)\n\n\
         *Answer not here, have feedback, or want to help with development? Join the bot's [Discord server](<{support_url}>)!*\n\n\
         -# *Disclaimer: Flat Notifs is not made by Flat.io. It is a project that uses the Flat.io API, made by a member of the community. \
         Additionally, it is not guaranteed to be free of bugs, be updated frequently, or even work. Updates may introduce breaking changes. \
         Logs are collected for debug purposes.*"
    );
    [intro, commands]
}

/// Release notes.
pub fn version(support_url: &str) -> String {
    format!(
        "**Current version:**\n\
         v{} - Rust rewrite: encrypted SQLite storage, persisted dedup cursor, mention flag for sendhere\n\n\
         *(Go to the bot's [Discord server](<{support_url}>) for more details and older patch notes!)*",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn greeting(prefix: &str) -> String {
    format!(
        "Hello to you too! <3\n\
         ({prefix} is not a valid command by itself; use  `{prefix} help`  for a list of valid commands.)"
    )
}

pub fn invalid_command(prefix: &str) -> String {
    format!(
        "Whoops! That command was invalid.\n\
         (Use  `{prefix} help`  for a list of valid commands. Make sure the command is spelled correctly!)"
    )
}

pub fn dm_only(prefix: &str, command: &str) -> String {
    format!("`{prefix} {command}`  must be used in DMs!")
}

/// Reply when the feed or chat platform failed mid-command.
pub fn retry_later(command: &str, support_url: &str) -> String {
    format!(
        "Uh oh, there was an error during {command}. Please try again later \
         (if it doesn't resolve on its own soon, please join the bot's [Discord server](<{support_url}>) and report the bug!)"
    )
}

pub fn invalid_token() -> &'static str {
    "Please try again and provide a valid personal token \
     (double check that the token is still valid and has the notifications.readonly scope!)"
}

pub fn registered(prefix: &str) -> String {
    format!(
        "Successfully registered! (If you didn't mean to do this, use the command  `{prefix} unregister`. \
         To learn how to start setting rules, use the command  `{prefix} help` )"
    )
}

pub fn addrule_usage(prefix: &str, problem: &str) -> String {
    format!(
        "Please try again and provide include/exclude and a category and value in this format: \
         `{prefix} addrule include/exclude category value`  ({problem})"
    )
}

pub fn rule_added(category: &str, value: &str) -> String {
    format!("Rule {}: {} added", esc(category), esc(value))
}

pub fn category_not_found(category: &str) -> String {
    format!("Category {} not found", esc(category))
}

pub fn user_not_found(username: &str) -> String {
    format!(
        "User not found with username {}. Please try again and provide a valid username.",
        esc(username)
    )
}

pub fn removerule_usage(prefix: &str) -> String {
    format!("Please try again and provide a value in this format:  `{prefix} removerule value`")
}

pub fn rule_removed(value: &str, category: &str) -> String {
    format!("Rule {} removed from {}", esc(value), esc(category))
}

pub fn rule_not_found(value: &str) -> String {
    format!("Rule {} not found", esc(value))
}

pub fn override_toggled(enabled: bool, prefix: &str) -> String {
    if enabled {
        format!("Override enabled (You will now be notified of all notifications. Disable by using  `{prefix} override`)")
    } else {
        format!(
            "Override disabled (You will now only be notified of notifications that match your specified filters. \
             Re-enable by using  `{prefix} override`)"
        )
    }
}

pub fn paused(prefix: &str) -> String {
    format!("Notifications paused (You will not be notified of any notifications. Unpause by using  `{prefix} pause`)")
}

pub fn unpaused(prefix: &str) -> String {
    format!("Notifications unpaused (You will now resume being notified of notifications. Pause by using  `{prefix} pause`)")
}

pub fn sendhere_disabled() -> &'static str {
    "Successfully changed your notification channel back to default (your DMs)"
}

pub fn sendhere_not_in_dm() -> &'static str {
    "sendhere can only be set in non-DM channels."
}

pub fn sendhere_usage(prefix: &str) -> String {
    format!("Please try again and provide mention or nomention in this format:  `{prefix} sendhere mention/nomention`")
}

pub fn sendhere_prompt() -> &'static str {
    "Are you sure you want to switch your notification send channel to here? (Y/N)\n\
     If this is a public channel, that means anyone can see the notifications that the bot sends you."
}

pub fn sendhere_enabled(prefix: &str) -> String {
    format!(
        "Successfully changed your notification channel to this channel. \
         You can disable this at any time using {prefix} sendhere"
    )
}

pub fn unregister_prompt() -> &'static str {
    "Are you sure you want to unregister? (Y/N)\n\
     Unregistering means that you will lose any rules that you have set and will no longer receive notifications from this bot. \
     Only unregister if you don't want to receive notifications from this bot anymore or if you need to change your personal token."
}

pub fn unregistered(prefix: &str) -> String {
    format!("Successfully unregistered. You can re-register by using the command {prefix} getstarted")
}

pub fn updatetoken_missing() -> &'static str {
    "Please provide your new personal token."
}

pub fn updatetoken_prompt() -> &'static str {
    "Are you sure you want to update your personal token? (Y/N)\n\
     Updating your personal token will invalidate your old token. Make sure your new personal token is valid!"
}

pub fn token_updated() -> &'static str {
    "Successfully updated your personal token!"
}

pub fn cancelled_timeout(command: &str, secs: u64) -> String {
    format!("Cancelling {command} (no response for {secs} sec)")
}

pub fn cancelled_declined(command: &str) -> String {
    format!("Cancelling {command} (received a response other than 'Y')")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texts_use_the_configured_prefix() {
        assert!(welcome("!n", "https://x").contains("`!n getstarted token`"));
        assert!(help("!n", "https://x")[1].contains("`!n addrule include/exclude category value`"));
        assert!(greeting("!n").contains("`!n help`"));
    }

    #[test]
    fn user_supplied_values_are_escaped() {
        assert_eq!(rule_added("type", "a_b"), "Rule type: a\\_b added");
        assert_eq!(category_not_found("act*r"), "Category act\\*r not found");
        assert_eq!(rule_removed("x", "attachments.score.id"), "Rule x removed from attachments\\.score\\.id");
    }

    #[test]
    fn support_url_is_linked() {
        assert!(retry_later("addrule", "https://discord.gg/x").contains("<https://discord.gg/x>"));
        assert!(version("https://discord.gg/x").contains(env!("CARGO_PKG_VERSION")));
    }
}
