// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat command surface for the Flatrelay notification relay.
//!
//! Users register, edit rules, toggle pause and override, pick a delivery
//! channel and unregister by sending prefixed messages. Destructive or
//! exposing changes ask for a `Y` confirmation first.

pub mod confirm;
pub mod handler;
pub mod parse;
pub mod texts;

pub use confirm::{Confirmation, ConfirmationWaiter, PendingReply};
pub use handler::{CommandHandler, CommandSettings};
pub use parse::{parse, CommandName, Parsed};
