// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poll scheduler and delivery dispatcher for the Flatrelay relay.
//!
//! The [`Poller`] is the central coordinator that:
//! - Resolves chat handles and initializes dedup cursors at startup
//! - Polls each unpaused user's feed at a bounded, adaptive rate
//! - Evaluates new events against the user's rules
//! - Delivers matches through the [`Dispatcher`]
//! - Flushes the registry when it has unsaved changes

pub mod dispatch;
pub mod scheduler;
pub mod shutdown;

pub use dispatch::{Delivery, Dispatcher};
pub use scheduler::{CycleReport, Pacing, Poller};
pub use shutdown::{final_flush, install_signal_handler};
