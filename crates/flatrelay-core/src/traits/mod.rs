// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend [`RelayAdapter`] and use `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod adapter;
pub mod chat;
pub mod feed;
pub mod store;
pub mod vault;

pub use adapter::RelayAdapter;
pub use chat::ChatAdapter;
pub use feed::{FeedSource, FeedUser};
pub use store::UserStore;
pub use vault::CredentialVault;
