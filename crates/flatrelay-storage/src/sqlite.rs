// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`UserStore`].
//!
//! All statements run on tokio-rusqlite's single background thread. A save
//! replaces every row inside one transaction, so readers never see a
//! partially written registry.

use std::path::Path;

use async_trait::async_trait;
use flatrelay_core::types::{AdapterType, HealthStatus, SendHere};
use flatrelay_core::{RelayAdapter, RelayError, UserRecord, UserStore};
use rusqlite::params;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into RelayError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(message: String) -> RelayError {
    RelayError::Storage {
        source: message.into(),
    }
}

/// One `users` row in its stored form.
struct UserRow {
    id: i64,
    position: i64,
    api_key: String,
    important: String,
    override_rules: bool,
    paused: bool,
    sendhere: String,
    processed_ids: String,
}

impl UserRow {
    fn from_record(position: usize, record: &UserRecord) -> Result<Self, RelayError> {
        let encode = |e: serde_json::Error| RelayError::Storage { source: Box::new(e) };
        Ok(Self {
            id: i64::try_from(record.id.0)
                .map_err(|_| storage_err(format!("user id {} does not fit SQLite", record.id)))?,
            position: i64::try_from(position)
                .map_err(|_| storage_err("registry too large".to_string()))?,
            api_key: record.credential.0.clone(),
            important: serde_json::to_string(&record.rules).map_err(encode)?,
            override_rules: record.override_rules,
            paused: record.paused,
            sendhere: serde_json::to_string(&SendHere::from(record.destination)).map_err(encode)?,
            processed_ids: serde_json::to_string(&record.processed_ids).map_err(encode)?,
        })
    }

    /// Decodes through the record's serde shape so legacy column contents
    /// load the same way legacy snapshot files do.
    fn into_record(self) -> Result<UserRecord, RelayError> {
        let parse = |column: &str, text: &str| -> Result<Value, RelayError> {
            serde_json::from_str(text)
                .map_err(|e| storage_err(format!("user {}: invalid {column} column: {e}", self.id)))
        };
        let value = json!({
            "id": self.id,
            "api_key": self.api_key,
            "important": parse("important", &self.important)?,
            "override": self.override_rules,
            "paused": self.paused,
            "sendhere": parse("sendhere", &self.sendhere)?,
            "processed_ids": parse("processed_ids", &self.processed_ids)?,
        });
        serde_json::from_value(value)
            .map_err(|e| storage_err(format!("user {}: invalid record: {e}", self.id)))
    }
}

/// SQLite-backed user store.
pub struct SqliteUserStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteUserStore {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RelayError::Storage { source: Box::new(e) })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| RelayError::Storage { source: Box::new(e) })?;
        let store = Self { conn };
        store.prepare().await?;
        info!(path = %path.display(), "opened SQLite user store");
        Ok(store)
    }

    /// In-memory database, for tests.
    pub async fn open_in_memory() -> Result<Self, RelayError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| RelayError::Storage { source: Box::new(e) })?;
        let store = Self { conn };
        store.prepare().await?;
        Ok(store)
    }

    async fn prepare(&self) -> Result<(), RelayError> {
        self.conn
            .call(|conn| -> Result<Result<(), String>, rusqlite::Error> {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
            .map_err(|e| storage_err(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl RelayAdapter for SqliteUserStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, RelayError> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<UserRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, position, api_key, important, override, paused, sendhere, processed_ids \
                     FROM users ORDER BY position",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            position: row.get(1)?,
                            api_key: row.get(2)?,
                            important: row.get(3)?,
                            override_rules: row.get(4)?,
                            paused: row.get(5)?,
                            sendhere: row.get(6)?,
                            processed_ids: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        let records = rows
            .into_iter()
            .map(UserRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(users = records.len(), "loaded users from SQLite");
        Ok(records)
    }

    async fn save_all(&self, records: &[UserRecord]) -> Result<(), RelayError> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(position, record)| UserRow::from_record(position, record))
            .collect::<Result<Vec<_>, _>>()?;
        let count = rows.len();

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM users", [])?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO users (id, position, api_key, important, override, paused, sendhere, processed_ids) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )?;
                    for row in &rows {
                        stmt.execute(params![
                            row.id,
                            row.position,
                            row.api_key,
                            row.important,
                            row.override_rules,
                            row.paused,
                            row.sendhere,
                            row.processed_ids,
                        ])?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(users = count, "saved users to SQLite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrelay_core::{Category, Destination, UserId};
    use flatrelay_test_utils::UserBuilder;

    #[tokio::test]
    async fn empty_database_loads_no_users() {
        let store = SqliteUserStore::open_in_memory().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn save_replaces_previous_rows() {
        let store = SqliteUserStore::open_in_memory().await.unwrap();
        store
            .save_all(&[UserBuilder::new(1).build(), UserBuilder::new(2).build()])
            .await
            .unwrap();
        store.save_all(&[UserBuilder::new(2).build()]).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, UserId(2));
    }

    #[tokio::test]
    async fn records_round_trip_in_order() {
        let store = SqliteUserStore::open_in_memory().await.unwrap();
        let records = vec![
            UserBuilder::new(30)
                .include(Category::Type, "userFollow")
                .processed(&["a", "b"])
                .build(),
            UserBuilder::new(10).paused().override_rules().channel(77, true).build(),
        ];
        store.save_all(&records).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        for (a, b) in records.iter().zip(&loaded) {
            assert!(a.same_persisted_state(b), "{a:?} != {b:?}");
        }
        assert!(matches!(loaded[1].destination, Destination::Channel { mention: true, .. }));
    }

    #[tokio::test]
    async fn legacy_column_shapes_load() {
        let store = SqliteUserStore::open_in_memory().await.unwrap();
        store
            .conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO users (id, position, api_key, important, override, paused, sendhere) \
                     VALUES (5, 0, 'sealed', ?1, 0, 1, '{\"bool\": false}')",
                    params![r#"{"actor.username": ["+u1"], "type": ["scoreStar"], "attachments.score.id": []}"#],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded[0].id, UserId(5));
        assert!(loaded[0].paused);
        assert!(loaded[0].processed_ids.is_empty());
        let actor = loaded[0].rules.get(Category::Actor).unwrap();
        assert_eq!(actor.display_name("+u1"), Some("u1"));
    }
}
