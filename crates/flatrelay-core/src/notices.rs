// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notices sent by both the poller and command handlers.

/// Sent when a user's feed cannot be read and they have been auto-paused.
pub fn check_failed(prefix: &str) -> String {
    format!(
        "[DEBUG]: Unable to check your notifications! Did you delete your personal token? \
         (If not, this is probably just a result of a server error)\n\
         (Automatically pausing to avoid spamming; you can use  `{prefix} pause`  to unpause)"
    )
}

/// Sent when the configured channel is unreachable and delivery reverted to DMs.
pub fn channel_lost(prefix: &str) -> String {
    format!(
        "[DEBUG]: Unable to find your specified channel! Was the channel deleted, or did the bot lose access to it?\n\
         (Defaulting to DMs to avoid spamming; you can use  `{prefix} sendhere`  again to pick a channel to send notifications)"
    )
}
