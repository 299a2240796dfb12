// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backing store for user records.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::record::UserRecord;
use crate::traits::adapter::RelayAdapter;

/// Whole-registry persistence. Transient fields are never written.
#[async_trait]
pub trait UserStore: RelayAdapter {
    /// Loads every stored record in registry order.
    async fn load_all(&self) -> Result<Vec<UserRecord>, RelayError>;

    /// Replaces the stored records with `records`.
    async fn save_all(&self, records: &[UserRecord]) -> Result<(), RelayError>;
}
