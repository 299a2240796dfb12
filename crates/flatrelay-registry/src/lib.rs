// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry of every registered user.
//!
//! The registry itself is a plain collection. Concurrency comes from
//! [`SharedRegistry`], one async mutex that both the poller and the
//! command handlers take before touching a record.

pub mod registry;
pub mod shared;

pub use registry::Registry;
pub use shared::{flush_if_dirty, shared, SharedRegistry};
