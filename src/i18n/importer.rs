//! Corpus Importer: locale files -> system entries.
//!
//! - [`CorpusImporter::import`] replaces every system entry of the corpus
//!   namespace with the file contents.
//! - [`CorpusImporter::merge`] inserts new keys and updates changed ones,
//!   never deleting.
//! - [`CorpusImporter::bulk_add`] inserts an ad-hoc batch, skipping keys that
//!   already exist.
//!
//! Reading the files is all-or-nothing: any unreadable file aborts before the
//! store is touched. After that, each item succeeds or fails on its own and
//! the outcome is reported in counts rather than as an error.

use crate::error::{Result, TranslationError};
use crate::i18n::corpus::LocaleCorpus;
use crate::i18n::entry::{EntryFilter, EntryPatch, NewEntry, TranslationEntry, DEFAULT_NAMESPACE};
use crate::i18n::registry::LocaleRegistry;
use crate::i18n::store::EntryStore;
use crate::i18n::tree::{flatten, merge_flat, FlatEntries, FlatTree};
use crate::i18n::validator::EntryValidator;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of rows per batched insert.
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Shared flag that stops a long-running import between items.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running operations to stop after the current item.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One item that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub key_path: String,
    pub locale: Option<String>,
    pub reason: String,
}

impl ItemFailure {
    fn new(key_path: &str, reason: impl ToString) -> Self {
        Self {
            key_path: key_path.to_string(),
            locale: None,
            reason: reason.to_string(),
        }
    }
}

/// Per-item outcome counts for import and merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: Vec<ItemFailure>,
    pub total_processed: usize,
    /// Rows removed before a full import.
    pub deleted: u64,
    pub interrupted: bool,
}

impl BatchReport {
    /// Whether any item failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Outcome of [`CorpusImporter::bulk_add`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddReport {
    pub inserted: Vec<TranslationEntry>,
    /// Key paths that already existed (in the store or earlier in the batch).
    pub skipped: Vec<String>,
    pub failed: Vec<ItemFailure>,
    /// Key paths left unattempted because the interrupt was raised.
    pub not_processed: Vec<String>,
    pub interrupted: bool,
}

pub struct CorpusImporter<'a> {
    store: &'a dyn EntryStore,
    corpus: &'a LocaleCorpus,
    registry: &'a LocaleRegistry,
    namespace: String,
    chunk_size: usize,
    interrupt: Interrupt,
}

impl<'a> CorpusImporter<'a> {
    pub fn new(
        store: &'a dyn EntryStore,
        corpus: &'a LocaleCorpus,
        registry: &'a LocaleRegistry,
    ) -> Self {
        Self {
            store,
            corpus,
            registry,
            namespace: DEFAULT_NAMESPACE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Rows per batched insert; zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Read every enabled locale file and merge them per key.
    ///
    /// The canonical locale file must exist; other missing files are skipped.
    /// Files are read and flattened concurrently.
    pub async fn load_candidates(&self) -> Result<Vec<NewEntry>> {
        let canonical = self.registry.canonical().code.as_str();
        let reads = self.registry.codes().into_iter().map(|locale| async move {
            let tree = self.corpus.read_tree(locale).await?;
            Ok::<(&str, Option<FlatTree>), TranslationError>((
                locale,
                tree.map(|t| flatten(&t, locale)),
            ))
        });

        let mut merged = FlatEntries::new();
        for (locale, flat) in try_join_all(reads).await? {
            match flat {
                Some(flat) => {
                    debug!("Read {} keys for '{}'", flat.len(), locale);
                    merge_flat(&mut merged, locale, flat);
                }
                None if locale == canonical => {
                    return Err(TranslationError::CorpusIo {
                        locale: locale.to_string(),
                        path: self.corpus.path_for(locale).display().to_string(),
                        message: "required locale file is missing".to_string(),
                    });
                }
                None => warn!("No locale file for '{}', skipping", locale),
            }
        }

        Ok(merged
            .into_iter()
            .map(|(key_path, values)| {
                NewEntry::system(key_path, values).with_namespace(&self.namespace)
            })
            .collect())
    }

    /// Destructive import: drop the namespace's system entries, then insert
    /// the file contents in chunks.
    pub async fn import(&self) -> Result<BatchReport> {
        let candidates = self.load_candidates().await?;
        info!(
            "Importing {} keys into namespace '{}'",
            candidates.len(),
            self.namespace
        );

        let mut report = BatchReport {
            deleted: self
                .store
                .delete_where(&EntryFilter::system().namespace(&self.namespace))
                .await?,
            ..BatchReport::default()
        };
        info!("Removed {} existing system entries", report.deleted);

        for (index, chunk) in candidates.chunks(self.chunk_size).enumerate() {
            if self.interrupt.is_raised() {
                report.interrupted = true;
                break;
            }

            match self.store.insert_batch(chunk.to_vec()).await {
                Ok(rows) => {
                    report.inserted += rows.len();
                    report.total_processed += chunk.len();
                    debug!("Chunk {} inserted ({} rows)", index + 1, rows.len());
                }
                Err(e) => {
                    warn!("Chunk {} failed ({}), inserting rows individually", index + 1, e);
                    for entry in chunk {
                        if self.interrupt.is_raised() {
                            report.interrupted = true;
                            break;
                        }
                        report.total_processed += 1;
                        match self.store.insert(entry.clone()).await {
                            Ok(_) => report.inserted += 1,
                            Err(e) => {
                                warn!("Failed to insert '{}': {}", entry.key_path, e);
                                report.failed.push(ItemFailure::new(&entry.key_path, e));
                            }
                        }
                    }
                }
            }
        }

        info!(
            "Import finished: {} inserted, {} failed{}",
            report.inserted,
            report.failed.len(),
            if report.interrupted { " (interrupted)" } else { "" }
        );
        Ok(report)
    }

    /// Non-destructive merge: insert new keys, update changed ones, skip the rest.
    pub async fn merge(&self) -> Result<BatchReport> {
        let candidates = self.load_candidates().await?;
        info!(
            "Merging {} keys into namespace '{}'",
            candidates.len(),
            self.namespace
        );

        let mut report = BatchReport::default();
        for candidate in candidates {
            if self.interrupt.is_raised() {
                report.interrupted = true;
                break;
            }
            report.total_processed += 1;

            let existing = match self
                .store
                .find_one(None, &candidate.namespace, &candidate.key_path)
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("Lookup failed for '{}': {}", candidate.key_path, e);
                    report.failed.push(ItemFailure::new(&candidate.key_path, e));
                    continue;
                }
            };

            match existing {
                None => {
                    let key_path = candidate.key_path.clone();
                    match self.store.insert(candidate).await {
                        Ok(_) => report.inserted += 1,
                        Err(e) if e.is_duplicate() => {
                            debug!("'{}' appeared concurrently, skipping", key_path);
                            report.skipped += 1;
                        }
                        Err(e) => {
                            warn!("Failed to insert '{}': {}", key_path, e);
                            report.failed.push(ItemFailure::new(&key_path, e));
                        }
                    }
                }
                Some(entry) if entry.values == candidate.values => report.skipped += 1,
                Some(entry) => {
                    match self
                        .store
                        .update(&entry.id, EntryPatch::values(candidate.values))
                        .await
                    {
                        Ok(_) => report.updated += 1,
                        Err(e) => {
                            warn!("Failed to update '{}': {}", entry.key_path, e);
                            report.failed.push(ItemFailure::new(&entry.key_path, e));
                        }
                    }
                }
            }
        }

        info!(
            "Merge finished: {} inserted, {} updated, {} unchanged, {} failed",
            report.inserted,
            report.updated,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    /// Insert system entries one at a time, skipping keys that already exist.
    pub async fn bulk_add(&self, entries: Vec<NewEntry>) -> Result<BulkAddReport> {
        let mut seen: HashSet<(String, String)> = self
            .store
            .find(&EntryFilter::system())
            .await?
            .into_iter()
            .map(|e| (e.namespace, e.key_path))
            .collect();

        let canonical = self.registry.canonical().code.as_str();
        let mut report = BulkAddReport::default();

        let mut entries = entries.into_iter();
        while let Some(entry) = entries.next() {
            if self.interrupt.is_raised() {
                report.interrupted = true;
                report.not_processed = std::iter::once(entry)
                    .chain(entries.by_ref())
                    .map(|e| e.key_path)
                    .collect();
                break;
            }
            if entry.team_id.is_some() {
                report.failed.push(ItemFailure::new(
                    &entry.key_path,
                    "bulk add only accepts system entries",
                ));
                continue;
            }
            if let Err(e) = EntryValidator::validate_new(&entry, self.registry, Some(canonical))
                .into_result(&entry.key_path)
            {
                report.failed.push(ItemFailure::new(&entry.key_path, e));
                continue;
            }
            if !seen.insert((entry.namespace.clone(), entry.key_path.clone())) {
                report.skipped.push(entry.key_path);
                continue;
            }

            let key_path = entry.key_path.clone();
            match self.store.insert(entry).await {
                Ok(row) => report.inserted.push(row),
                Err(e) if e.is_duplicate() => report.skipped.push(key_path),
                Err(e) => {
                    warn!("Failed to add '{}': {}", key_path, e);
                    report.failed.push(ItemFailure::new(&key_path, e));
                }
            }
        }

        info!(
            "Bulk add finished: {} inserted, {} skipped, {} failed{}",
            report.inserted.len(),
            report.skipped.len(),
            report.failed.len(),
            if report.interrupted {
                format!(" (interrupted, {} not processed)", report.not_processed.len())
            } else {
                String::new()
            }
        );
        Ok(report)
    }
}
