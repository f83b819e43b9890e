//! Entry Store: persistence boundary for translation entries.
//!
//! [`EntryStore`] is the typed contract every other component talks to. The
//! SQLite implementation lives in [`crate::db`]; [`MemoryStore`] is a
//! process-local implementation used by tests and embedded callers.

use crate::error::{Result, TranslationError};
use crate::i18n::entry::{EntryFilter, EntryPatch, NewEntry, TranslationEntry};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries matching `filter`, ordered by (namespace, key path, team).
    async fn find(&self, filter: &EntryFilter) -> Result<Vec<TranslationEntry>>;

    /// The unique entry for `(team_id, namespace, key_path)`; `None` team = system.
    async fn find_one(
        &self,
        team_id: Option<&str>,
        namespace: &str,
        key_path: &str,
    ) -> Result<Option<TranslationEntry>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<TranslationEntry>>;

    /// Insert a new row. Fails with `DuplicateKey` when the key is taken.
    async fn insert(&self, entry: NewEntry) -> Result<TranslationEntry>;

    /// Insert several rows as one unit; either all are stored or none.
    ///
    /// The default implementation inserts one at a time and stops at the
    /// first failure, so it is only all-or-nothing for stores that override it.
    async fn insert_batch(&self, entries: Vec<NewEntry>) -> Result<Vec<TranslationEntry>> {
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            inserted.push(self.insert(entry).await?);
        }
        Ok(inserted)
    }

    /// Apply a partial update. Fails with `NotFound` when `id` does not exist.
    async fn update(&self, id: &str, patch: EntryPatch) -> Result<TranslationEntry>;

    /// Physically delete a row. Returns `false` when nothing matched.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every row matching `filter`, returning the count removed.
    async fn delete_where(&self, filter: &EntryFilter) -> Result<u64>;
}

pub(crate) fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn sort_entries(entries: &mut [TranslationEntry]) {
    entries.sort_by(|a, b| {
        (&a.namespace, &a.key_path, &a.team_id).cmp(&(&b.namespace, &b.key_path, &b.team_id))
    });
}

/// In-memory entry store guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<TranslationEntry>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TranslationEntry>> {
        // Every mutation is a single push/retain, so a poisoned Vec is still consistent.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn duplicate_of(rows: &[TranslationEntry], entry: &NewEntry) -> bool {
        rows.iter().any(|row| {
            row.team_id == entry.team_id
                && row.namespace == entry.namespace
                && row.key_path == entry.key_path
        })
    }
}

fn duplicate_error(entry: &NewEntry) -> TranslationError {
    TranslationError::DuplicateKey {
        team_id: entry.team_id.clone(),
        namespace: entry.namespace.clone(),
        key_path: entry.key_path.clone(),
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn find(&self, filter: &EntryFilter) -> Result<Vec<TranslationEntry>> {
        let mut found: Vec<_> = self
            .lock()
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        sort_entries(&mut found);
        Ok(found)
    }

    async fn find_one(
        &self,
        team_id: Option<&str>,
        namespace: &str,
        key_path: &str,
    ) -> Result<Option<TranslationEntry>> {
        Ok(self
            .lock()
            .iter()
            .find(|row| {
                row.belongs_to(team_id) && row.namespace == namespace && row.key_path == key_path
            })
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TranslationEntry>> {
        Ok(self.lock().iter().find(|row| row.id == id).cloned())
    }

    async fn insert(&self, entry: NewEntry) -> Result<TranslationEntry> {
        let mut rows = self.lock();
        if Self::duplicate_of(&rows, &entry) {
            return Err(duplicate_error(&entry));
        }
        let stored = entry.into_entry(new_entry_id(), Utc::now());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn insert_batch(&self, entries: Vec<NewEntry>) -> Result<Vec<TranslationEntry>> {
        let mut rows = self.lock();
        let mut staged: Vec<TranslationEntry> = Vec::with_capacity(entries.len());
        let now = Utc::now();
        for entry in entries {
            let clashes_staged = staged.iter().any(|row| {
                row.team_id == entry.team_id
                    && row.namespace == entry.namespace
                    && row.key_path == entry.key_path
            });
            if clashes_staged || Self::duplicate_of(&rows, &entry) {
                return Err(duplicate_error(&entry));
            }
            staged.push(entry.into_entry(new_entry_id(), now));
        }
        rows.extend(staged.iter().cloned());
        Ok(staged)
    }

    async fn update(&self, id: &str, patch: EntryPatch) -> Result<TranslationEntry> {
        let mut rows = self.lock();
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| TranslationError::not_found(id))?;
        patch.apply(row, Utc::now());
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut rows = self.lock();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_where(&self, filter: &EntryFilter) -> Result<u64> {
        let mut rows = self.lock();
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }
}
