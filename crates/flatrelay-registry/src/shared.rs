// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared registry handle and persistence flush.

use std::sync::Arc;

use flatrelay_core::{RelayError, UserStore};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::registry::Registry;

/// The single mutation lock around the registry, shared by the poller and
/// command handlers.
pub type SharedRegistry = Arc<Mutex<Registry>>;

pub fn shared(registry: Registry) -> SharedRegistry {
    Arc::new(Mutex::new(registry))
}

/// Writes the registry to `store` if it has unflushed mutations.
///
/// The snapshot is taken under the lock and written without it. On failure
/// the registry stays dirty so the next call retries. Returns whether a
/// write happened.
pub async fn flush_if_dirty(registry: &SharedRegistry, store: &dyn UserStore) -> Result<bool, RelayError> {
    let (records, generation) = {
        let guard = registry.lock().await;
        if !guard.is_dirty() {
            return Ok(false);
        }
        guard.snapshot()
    };

    debug!(users = records.len(), generation, "flushing user registry");
    store.save_all(&records).await?;

    registry.lock().await.mark_flushed(generation);
    info!(users = records.len(), store = store.name(), "user registry flushed");
    Ok(true)
}
