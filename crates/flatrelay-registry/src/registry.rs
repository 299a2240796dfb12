// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The user registry.
//!
//! Dirty tracking uses a generation counter instead of a flag: every
//! mutation bumps `generation`, and a flush records the generation it
//! wrote. A mutation that lands while a snapshot is being written leaves
//! the registry dirty for the next flush.

use std::collections::HashSet;

use flatrelay_core::{RelayError, UserId, UserRecord, UserStore};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct Registry {
    users: Vec<UserRecord>,
    generation: u64,
    flushed: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a clean registry from already-loaded records.
    ///
    /// Duplicate ids keep their first occurrence. Every cursor is resized
    /// to `cursor_capacity`.
    pub fn from_records(records: Vec<UserRecord>, cursor_capacity: usize) -> Self {
        let mut seen = HashSet::new();
        let mut users = Vec::with_capacity(records.len());
        for mut record in records {
            if !seen.insert(record.id) {
                warn!(user_id = %record.id, "dropping duplicate stored user record");
                continue;
            }
            record.processed_ids.set_capacity(cursor_capacity);
            users.push(record);
        }
        Self {
            users,
            generation: 0,
            flushed: 0,
        }
    }

    /// Loads every record from `store`.
    pub async fn load(store: &dyn UserStore, cursor_capacity: usize) -> Result<Self, RelayError> {
        let records = store.load_all().await?;
        let registry = Self::from_records(records, cursor_capacity);
        info!(users = registry.len(), store = store.name(), "user registry loaded");
        Ok(registry)
    }

    pub fn all(&self) -> &[UserRecord] {
        &self.users
    }

    /// Ids in registry order.
    pub fn ids(&self) -> Vec<UserId> {
        self.users.iter().map(|u| u.id).collect()
    }

    pub fn find(&self, id: UserId) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Mutable access. Callers mark the registry dirty after changing
    /// persisted fields.
    pub fn find_mut(&mut self, id: UserId) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.find(id).is_some()
    }

    /// Appends a new user and marks the registry dirty.
    pub fn add(&mut self, record: UserRecord) -> Result<(), RelayError> {
        if self.contains(record.id) {
            return Err(RelayError::DuplicateUser(record.id));
        }
        self.users.push(record);
        self.mark_dirty();
        Ok(())
    }

    /// Removes a user, marking the registry dirty if one was removed.
    pub fn remove(&mut self, id: UserId) -> Option<UserRecord> {
        let idx = self.users.iter().position(|u| u.id == id)?;
        let removed = self.users.remove(idx);
        self.mark_dirty();
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn mark_dirty(&mut self) {
        self.generation += 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.generation != self.flushed
    }

    /// Copy of the records together with the generation they represent.
    pub fn snapshot(&self) -> (Vec<UserRecord>, u64) {
        (self.users.clone(), self.generation)
    }

    /// Records that `generation` reached the store.
    pub fn mark_flushed(&mut self, generation: u64) {
        if generation > self.flushed {
            self.flushed = generation;
        }
    }
}
