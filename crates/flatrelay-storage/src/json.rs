// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON snapshot file implementation of [`UserStore`].
//!
//! The file holds one JSON array of user records. Saves write a sibling
//! temporary file and rename it over the snapshot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flatrelay_core::types::{AdapterType, HealthStatus};
use flatrelay_core::{RelayAdapter, RelayError, UserRecord, UserStore};
use tokio::sync::Mutex;
use tracing::{debug, info};

fn io_err(e: std::io::Error) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RelayAdapter for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(HealthStatus::Degraded("snapshot file not written yet".to_string()))
            }
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, RelayError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_err(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let records: Vec<UserRecord> = serde_json::from_slice(&bytes).map_err(|e| RelayError::Storage {
            source: Box::new(e),
        })?;
        debug!(users = records.len(), path = %self.path.display(), "loaded snapshot");
        Ok(records)
    }

    async fn save_all(&self, records: &[UserRecord]) -> Result<(), RelayError> {
        let body = serde_json::to_vec_pretty(records).map_err(|e| RelayError::Storage {
            source: Box::new(e),
        })?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &body).await.map_err(io_err)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(io_err)?;
        debug!(users = records.len(), path = %self.path.display(), "wrote snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrelay_test_utils::UserBuilder;
    use serde_json::Value;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("users.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_writes_persisted_schema_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let store = JsonFileStore::new(&path);
        store
            .save_all(&[UserBuilder::new(8).channel(4, false).build()])
            .await
            .unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let user = &raw[0];
        for key in ["id", "api_key", "important", "override", "paused", "sendhere", "processed_ids"] {
            assert!(user.get(key).is_some(), "missing {key}");
        }
        assert!(user.get("handles").is_none());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn legacy_snapshot_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{"id": 12, "api_key": "x", "important": {"actor.username": {"+u1": "ann"}, "type": ["userFollow"], "attachments.score.id": []}, "override": true, "paused": false, "sendhere": {"bool": true, "channel_id": 99}}]"#,
        )
        .unwrap();

        let records = JsonFileStore::new(&path).load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].override_rules);
        assert!(records[0].destination.is_channel());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileStore::new(&path).load_all().await.is_err());
    }
}
