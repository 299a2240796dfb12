// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted feed source keyed by plaintext token.
//!
//! Each token has a queue of one-shot outcomes consumed in order, then
//! falls back to its standing page (empty unless set).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use flatrelay_core::traits::{FeedSource, FeedUser};
use flatrelay_core::{FeedEvent, RelayError};

/// Result of one scripted fetch.
#[derive(Debug, Clone)]
pub enum FeedOutcome {
    Page(Vec<FeedEvent>),
    HardFailure,
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<FeedOutcome>>,
    standing: HashMap<String, Vec<FeedEvent>>,
    fetches: HashMap<String, usize>,
    users: HashMap<String, FeedUser>,
    lookup_fails: bool,
    lookups: usize,
    fetch_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct ScriptedFeed {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page returned for `token` whenever nothing is queued.
    pub async fn set_page(&self, token: &str, page: Vec<FeedEvent>) {
        self.script.lock().await.standing.insert(token.to_string(), page);
    }

    /// Make every fetch take `delay` before answering.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        self.script.lock().await.fetch_delay = Some(delay);
    }

    /// Queue a one-shot outcome for `token`.
    pub async fn push(&self, token: &str, outcome: FeedOutcome) {
        self.script
            .lock()
            .await
            .queued
            .entry(token.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Register a feed account answerable by username and by id.
    pub async fn add_user(&self, id: &str, username: &str) {
        let user = FeedUser {
            id: id.to_string(),
            username: username.to_string(),
        };
        let mut script = self.script.lock().await;
        script.users.insert(id.to_string(), user.clone());
        script.users.insert(username.to_string(), user);
    }

    /// Make every user lookup a hard failure.
    pub async fn fail_lookups(&self) {
        self.script.lock().await.lookup_fails = true;
    }

    /// Number of fetches issued with `token`.
    pub async fn fetch_count(&self, token: &str) -> usize {
        self.script
            .lock()
            .await
            .fetches
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_fetches(&self) -> usize {
        self.script.lock().await.fetches.values().sum()
    }

    pub async fn lookup_count(&self) -> usize {
        self.script.lock().await.lookups
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self, credential: &SecretString) -> Result<Vec<FeedEvent>, RelayError> {
        let token = credential.expose_secret();
        let delay = self.script.lock().await.fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().await;
        *script.fetches.entry(token.to_string()).or_default() += 1;

        let queued = script.queued.get_mut(token).and_then(VecDeque::pop_front);
        match queued {
            Some(FeedOutcome::Page(page)) => Ok(page),
            Some(FeedOutcome::HardFailure) => Err(RelayError::feed("scripted hard failure")),
            None => Ok(script.standing.get(token).cloned().unwrap_or_default()),
        }
    }

    async fn lookup_user(
        &self,
        identifier: &str,
        _credential: &SecretString,
    ) -> Result<Option<FeedUser>, RelayError> {
        let mut script = self.script.lock().await;
        script.lookups += 1;
        if script.lookup_fails {
            return Err(RelayError::feed("scripted lookup failure"));
        }
        Ok(script.users.get(identifier).cloned())
    }
}
