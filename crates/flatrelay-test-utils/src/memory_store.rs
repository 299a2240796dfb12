// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `UserStore` with save failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use flatrelay_core::traits::{RelayAdapter, UserStore};
use flatrelay_core::types::{AdapterType, HealthStatus};
use flatrelay_core::{RelayError, UserRecord};

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<UserRecord>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<UserRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    /// Records as last saved.
    pub async fn records(&self) -> Vec<UserRecord> {
        self.records.lock().await.clone()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, RelayError> {
        Ok(self.records.lock().await.clone())
    }

    async fn save_all(&self, records: &[UserRecord]) -> Result<(), RelayError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RelayError::Storage {
                source: Box::new(std::io::Error::other("injected save failure")),
            });
        }
        *self.records.lock().await = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
