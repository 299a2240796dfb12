// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backing stores for the user registry.
//!
//! [`SqliteUserStore`] is the default; [`JsonFileStore`] keeps the whole
//! registry in one snapshot file.

pub mod json;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use flatrelay_config::model::{StorageBackend, StorageConfig};
use flatrelay_core::{RelayError, UserStore};

pub use json::JsonFileStore;
pub use sqlite::SqliteUserStore;

/// Opens the store selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn UserStore>, RelayError> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteUserStore::open(&config.database_path).await?)),
        StorageBackend::Json => Ok(Arc::new(JsonFileStore::new(&config.json_path))),
    }
}
