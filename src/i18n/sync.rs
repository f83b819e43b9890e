//! Corpus Exporter: system entries -> locale files.
//!
//! Sync is a targeted merge into what is already on disk. Each locale file is
//! read fresh, only the leaves for tracked keys are overwritten, and keys that
//! exist only in the file survive. Every tree is rebuilt in memory before the
//! first file is written.
//!
//! Files are not locked; a concurrent writer to the same locale file during
//! a sync can lose its update.

use crate::error::Result;
use crate::i18n::corpus::LocaleCorpus;
use crate::i18n::entry::{EntryFilter, DEFAULT_NAMESPACE};
use crate::i18n::registry::LocaleRegistry;
use crate::i18n::store::EntryStore;
use crate::i18n::tree::set_path;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// System entries applied to the trees.
    pub synced: usize,
    pub locales_written: Vec<String>,
}

pub struct CorpusExporter<'a> {
    store: &'a dyn EntryStore,
    corpus: &'a LocaleCorpus,
    registry: &'a LocaleRegistry,
    namespace: String,
}

impl<'a> CorpusExporter<'a> {
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
        }
    }

    /// Export a namespace other than the default one.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Write system entries into the locale files, keeping keys only the files have.
    pub async fn sync(&self) -> Result<SyncReport> {
        let entries = self
            .store
            .find(&EntryFilter::system().namespace(&self.namespace))
            .await?;

        let mut trees: BTreeMap<&str, Value> = BTreeMap::new();
        for locale in self.registry.codes() {
            trees.insert(locale, self.corpus.read_tree_or_empty(locale).await?);
        }

        for entry in &entries {
            for (locale, value) in &entry.values {
                if value.trim().is_empty() {
                    continue;
                }
                match trees.get_mut(locale.as_str()) {
                    Some(tree) => set_path(tree, &entry.key_path, Value::String(value.clone())),
                    None => debug!(
                        "Ignoring '{}' value of '{}': locale not configured",
                        locale, entry.key_path
                    ),
                }
            }
        }

        let mut report = SyncReport {
            synced: entries.len(),
            locales_written: Vec::with_capacity(trees.len()),
        };
        for (locale, tree) in &trees {
            self.corpus.write_tree(locale, tree).await?;
            report.locales_written.push(locale.to_string());
        }

        info!(
            "Synced {} entries to {} locale files in {}",
            report.synced,
            report.locales_written.len(),
            self.corpus.dir().display()
        );
        Ok(report)
    }
}
