// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream notification feed.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::RelayError;
use crate::event::FeedEvent;

/// A feed account, as returned by user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedUser {
    pub id: String,
    pub username: String,
}

#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    /// Fetches one page of notifications, newest first.
    ///
    /// Auth failure and not-found yield `Ok` with an empty page. Any other
    /// failure is returned as [`RelayError::Feed`].
    async fn fetch(&self, credential: &SecretString) -> Result<Vec<FeedEvent>, RelayError>;

    /// Looks up a feed account by username or id. `Ok(None)` when unknown.
    async fn lookup_user(
        &self,
        identifier: &str,
        credential: &SecretString,
    ) -> Result<Option<FeedUser>, RelayError>;
}
