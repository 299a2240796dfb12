// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line parsing.
//!
//! A command is a message whose first whitespace-separated token is exactly
//! the configured prefix. The second token names the command and is matched
//! case-insensitively; the rest are arguments.

use strum::{Display, EnumString};

/// Known command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommandName {
    GetStarted,
    AddRule,
    RemoveRule,
    Override,
    Pause,
    SendHere,
    Unregister,
    UpdateToken,
    Rules,
    Version,
    Help,
}

/// A message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// The prefix alone.
    Greeting,
    /// A known command with its arguments.
    Command { name: CommandName, args: Vec<String> },
    /// Anything else after the prefix.
    Unknown(String),
}

/// Parses `content`, returning `None` when the message is not addressed to the bot.
pub fn parse(prefix: &str, content: &str) -> Option<Parsed> {
    let mut tokens = content.split_whitespace();
    if tokens.next()? != prefix {
        return None;
    }
    let Some(word) = tokens.next() else {
        return Some(Parsed::Greeting);
    };
    let args = tokens.map(str::to_string).collect();
    Some(match word.parse::<CommandName>() {
        Ok(name) => Parsed::Command { name, args },
        Err(_) => Parsed::Unknown(word.to_string()),
    })
}
