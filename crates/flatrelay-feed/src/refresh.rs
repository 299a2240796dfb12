// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic connection pool replacement.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::fetcher::Fetcher;

/// Refreshes `fetcher`'s pool every `period` until `cancel` fires.
///
/// The first refresh happens one full period after start.
pub async fn run_refresh_loop(fetcher: Arc<Fetcher>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("feed pool refresh loop stopped");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = fetcher.refresh() {
                    warn!(error = %e, "feed pool refresh failed");
                }
            }
        }
    }
}
