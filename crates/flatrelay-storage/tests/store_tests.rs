// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Both backends persist and reload the same registry.

use flatrelay_config::model::{StorageBackend, StorageConfig};
use flatrelay_core::{Category, Sign, UserId};
use flatrelay_storage::open_store;
use flatrelay_test_utils::UserBuilder;

fn config(backend: StorageBackend, dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        backend,
        database_path: dir.path().join("flatrelay.db").display().to_string(),
        json_path: dir.path().join("data.json").display().to_string(),
    }
}

async fn round_trip(backend: StorageBackend) {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![
        UserBuilder::new(101)
            .actor(Sign::Exclude, "u7", "noisy")
            .include(Category::Type, "scoreComment")
            .processed(&["n1", "n2", "n3"])
            .build(),
        UserBuilder::new(102).paused().channel(55, false).build(),
    ];

    {
        let store = open_store(&config(backend, &dir)).await.unwrap();
        store.save_all(&records).await.unwrap();
        store.shutdown().await.unwrap();
    }

    let store = open_store(&config(backend, &dir)).await.unwrap();
    let loaded = store.load_all().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, UserId(101));
    for (a, b) in records.iter().zip(&loaded) {
        assert!(a.same_persisted_state(b));
    }
}

#[tokio::test]
async fn sqlite_store_survives_reopen() {
    round_trip(StorageBackend::Sqlite).await;
}

#[tokio::test]
async fn json_store_survives_reopen() {
    round_trip(StorageBackend::Json).await;
}
