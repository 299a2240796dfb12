// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The poll scheduler.
//!
//! [`Poller::startup`] runs once: it resolves every user's conversation
//! handles and initializes cursors. [`Poller::run`] then repeats cycles
//! until cancelled. A cycle flushes the registry if dirty, then polls each
//! unpaused user in registry order with a fixed pause between users.
//!
//! Feed calls happen without the registry lock. The lock is taken for the
//! evaluate-and-deliver pass of one user at a time, which serializes the
//! poller against command handlers.

use std::sync::Arc;
use std::time::Duration;

use flatrelay_config::model::PollerConfig;
use flatrelay_core::notices;
use flatrelay_core::{
    CredentialVault, FeedEvent, FeedSource, RelayError, SealedCredential, UserId, UserRecord,
    UserStore,
};
use flatrelay_registry::{flush_if_dirty, SharedRegistry};
use flatrelay_rules::{evaluate, mark_processed, new_events, render_notification};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::{Delivery, Dispatcher};

/// Pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between two polled users within a cycle.
    pub per_user: Duration,
    /// Pause between two users during startup.
    pub startup: Duration,
    /// Cycle interval when nobody is registered.
    pub idle: Duration,
}

impl From<&PollerConfig> for Pacing {
    fn from(config: &PollerConfig) -> Self {
        Self {
            per_user: Duration::from_secs(config.per_user_delay_secs),
            startup: Duration::from_secs(config.startup_delay_secs),
            idle: Duration::from_secs(config.idle_interval_secs),
        }
    }
}

impl Pacing {
    /// Start-to-start interval of a cycle over `users` registered users.
    pub fn cycle_interval(&self, users: usize) -> Duration {
        if users == 0 {
            self.idle
        } else {
            self.per_user.saturating_mul(u32::try_from(users).unwrap_or(u32::MAX))
        }
    }
}

/// What one cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub polled: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub paused: usize,
}

pub struct Poller {
    registry: SharedRegistry,
    store: Arc<dyn UserStore>,
    feed: Arc<dyn FeedSource>,
    vault: Arc<dyn CredentialVault>,
    dispatcher: Dispatcher,
    pacing: Pacing,
}

impl Poller {
    pub fn new(
        registry: SharedRegistry,
        store: Arc<dyn UserStore>,
        feed: Arc<dyn FeedSource>,
        vault: Arc<dyn CredentialVault>,
        dispatcher: Dispatcher,
        pacing: Pacing,
    ) -> Self {
        Self {
            registry,
            store,
            feed,
            vault,
            dispatcher,
            pacing,
        }
    }

    /// Prepares every user before the first cycle.
    ///
    /// A user who cannot be messaged makes startup fail. Users whose first
    /// fetch fails, or returns nothing while their cursor is empty, are
    /// paused and told so. A persisted cursor is kept; an empty one is
    /// seeded from the fetched page.
    pub async fn startup(&self, cancel: &CancellationToken) -> Result<(), RelayError> {
        let ids = self.registry.lock().await.ids();
        info!(users = ids.len(), "preparing users");

        for (index, id) in ids.iter().copied().enumerate() {
            if index > 0 && !pause(self.pacing.startup, cancel).await {
                info!("startup interrupted by shutdown");
                return Ok(());
            }

            let credential = {
                let mut registry = self.registry.lock().await;
                let Some(user) = registry.find_mut(id) else {
                    continue;
                };
                if self.dispatcher.resolve_handles(user).await? {
                    registry.mark_dirty();
                }
                let user = registry.find(id).filter(|u| !u.paused);
                match user {
                    Some(user) => user.credential.clone(),
                    None => {
                        debug!(user_id = %id, "user paused, skipping startup fetch");
                        continue;
                    }
                }
            };

            let page = self.fetch(id, &credential).await;
            let mut registry = self.registry.lock().await;
            let Some(user) = registry.find_mut(id) else {
                continue;
            };
            match page {
                Ok(page) if !page.is_empty() => {
                    if user.processed_ids.is_empty() {
                        user.processed_ids.seed(&page);
                        registry.mark_dirty();
                        debug!(user_id = %id, seeded = page.len(), "cursor seeded");
                    }
                }
                Ok(_) if !user.processed_ids.is_empty() => {
                    debug!(user_id = %id, "empty startup page, keeping persisted cursor");
                }
                outcome => {
                    if let Err(e) = &outcome {
                        warn!(user_id = %id, phase = "startup", error = %e, "initial fetch failed");
                    }
                    user.paused = true;
                    registry.mark_dirty();
                    info!(user_id = %id, phase = "startup", "user auto-paused");
                    let Some(user) = registry.find_mut(id) else {
                        continue;
                    };
                    self.dispatcher
                        .notify_direct(user, &notices::check_failed(self.dispatcher.prefix()))
                        .await?;
                }
            }
        }

        info!(users = ids.len(), "startup complete");
        Ok(())
    }

    /// Runs cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("poll scheduler running");
        loop {
            let started = Instant::now();
            let users = self.registry.lock().await.len();
            let report = self.run_cycle(&cancel).await;
            info!(
                polled = report.polled,
                delivered = report.delivered,
                skipped = report.skipped,
                paused = report.paused,
                "poll cycle finished"
            );

            let next = started + self.pacing.cycle_interval(users);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next) => {}
            }
        }
        info!("poll scheduler stopped");
    }

    /// One pass over the registry.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        if let Err(e) = flush_if_dirty(&self.registry, self.store.as_ref()).await {
            error!(error = %e, "registry flush failed, will retry next cycle");
        }

        let mut report = CycleReport::default();
        let ids = self.registry.lock().await.ids();
        for id in ids {
            if cancel.is_cancelled() {
                break;
            }
            let credential = {
                let registry = self.registry.lock().await;
                match registry.find(id) {
                    Some(user) if !user.paused => user.credential.clone(),
                    _ => continue,
                }
            };
            if report.polled > 0 && !pause(self.pacing.per_user, cancel).await {
                break;
            }
            report.polled += 1;
            self.poll_user(id, credential, &mut report).await;
        }
        report
    }

    async fn poll_user(&self, id: UserId, credential: SealedCredential, report: &mut CycleReport) {
        let page = match self.fetch(id, &credential).await {
            Ok(page) => page,
            Err(e) => {
                warn!(user_id = %id, phase = "poll", error = %e, "feed fetch failed, skipping user this cycle");
                report.skipped += 1;
                return;
            }
        };

        let mut registry = self.registry.lock().await;
        let Some(user) = registry.find_mut(id) else {
            return;
        };
        // A command may have paused the user or rotated the token mid-fetch.
        if user.paused || user.credential != credential {
            debug!(user_id = %id, "user changed during fetch, discarding page");
            return;
        }

        if user.processed_ids.is_empty() {
            if page.is_empty() {
                user.paused = true;
                report.paused += 1;
                info!(user_id = %id, phase = "poll", "feed unreadable with no cursor, auto-pausing");
                if let Err(e) = self
                    .dispatcher
                    .notify_direct(user, &notices::check_failed(self.dispatcher.prefix()))
                    .await
                {
                    error!(user_id = %id, error = %e, "could not notify auto-paused user");
                }
            } else {
                user.processed_ids.seed(&page);
                debug!(user_id = %id, seeded = page.len(), "cursor seeded");
            }
            registry.mark_dirty();
            return;
        }

        let fresh = new_events(&page, &user.processed_ids).to_vec();
        if fresh.is_empty() {
            return;
        }
        report.delivered += self.process_events(user, &fresh).await;
        if user.paused {
            report.paused += 1;
        }
        registry.mark_dirty();
    }

    /// Evaluates and delivers `fresh` (newest-first) oldest to newest, then
    /// records every handled event in the cursor. Returns the delivery count.
    ///
    /// A user who cannot be reached is paused and the rest is dropped.
    async fn process_events(&self, user: &mut UserRecord, fresh: &[FeedEvent]) -> usize {
        let mut delivered = 0;
        let mut handled = 0;
        for event in fresh.iter().rev() {
            handled += 1;
            let outcome = evaluate(event, &mut user.rules, user.override_rules);
            if outcome.names_refreshed {
                debug!(user_id = %user.id, event_id = %event.id(), "cached actor names refreshed");
            }
            if !outcome.delivers(user.override_rules) {
                continue;
            }

            let text = render_notification(event, &outcome.triggered);
            match self.dispatcher.deliver(user, &text).await {
                Ok(Delivery::FellBack) => {
                    info!(user_id = %user.id, "destination reverted to direct messages");
                    delivered += 1;
                }
                Ok(_) => delivered += 1,
                Err(e) => {
                    error!(user_id = %user.id, event_id = %event.id(), error = %e, "delivery failed, pausing user");
                    user.paused = true;
                    break;
                }
            }
        }
        mark_processed(&mut user.processed_ids, &fresh[fresh.len() - handled..]);
        delivered
    }

    async fn fetch(&self, id: UserId, credential: &SealedCredential) -> Result<Vec<FeedEvent>, RelayError> {
        let token = self.vault.open(credential).inspect_err(|e| {
            error!(user_id = %id, error = %e, "stored credential could not be opened");
        })?;
        self.feed.fetch(&token).await
    }
}

/// Sleeps for `duration` unless cancelled first. Returns false on cancel.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
