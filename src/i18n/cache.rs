//! Client Cache: resolved translation sets keyed by `(team, locale)`.
//!
//! The cache is owned by a single client and mutated through `&mut self`;
//! there is no cross-client coherency. A slot is populated on first read and
//! served from memory afterwards until it is invalidated. After a local write
//! the affected slot is reloaded immediately rather than marked stale.

use crate::error::Result;
use crate::i18n::metrics::TranslationMetrics;
use crate::i18n::registry::LocaleRegistry;
use crate::i18n::resolver::ResolvedTranslation;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Cache slot identity. `team_id = None` caches the system-only view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub team_id: Option<String>,
    pub locale: String,
}

impl CacheKey {
    /// A slot key; `None` is the system-only view.
    pub fn new(team_id: Option<&str>, locale: &str) -> Self {
        Self {
            team_id: team_id.map(str::to_string),
            locale: locale.to_string(),
        }
    }

    /// A slot key for one team.
    pub fn team(team_id: &str, locale: &str) -> Self {
        Self::new(Some(team_id), locale)
    }
}

/// Where cache slots are loaded from: the "team + system with overrides" query.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<Vec<ResolvedTranslation>>;
}

pub struct TranslationCache<S> {
    source: S,
    registry: LocaleRegistry,
    slots: HashMap<CacheKey, Vec<ResolvedTranslation>>,
}

impl<S: TranslationSource> TranslationCache<S> {
    /// An empty cache over `source`.
    pub fn new(source: S, registry: LocaleRegistry) -> Self {
        Self {
            source,
            registry,
            slots: HashMap::new(),
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether the slot is loaded.
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.slots.contains_key(key)
    }

    /// The cached slot, if populated. Never loads.
    pub fn peek(&self, key: &CacheKey) -> Option<&[ResolvedTranslation]> {
        self.slots.get(key).map(Vec::as_slice)
    }

    /// The slot for `key`, loading it on first access.
    pub async fn get(&mut self, key: &CacheKey) -> Result<&[ResolvedTranslation]> {
        if self.slots.contains_key(key) {
            TranslationMetrics::global().record_cache_hit();
        } else {
            TranslationMetrics::global().record_cache_miss();
            self.populate(key).await?;
        }
        Ok(self.peek(key).unwrap_or_default())
    }

    /// Reload the slot for `key` regardless of its state.
    pub async fn refresh(&mut self, key: &CacheKey) -> Result<&[ResolvedTranslation]> {
        TranslationMetrics::global().record_cache_refresh();
        self.populate(key).await?;
        Ok(self.peek(key).unwrap_or_default())
    }

    /// Call after creating, updating or deleting a translation visible to `key`.
    pub async fn after_write(&mut self, key: &CacheKey) -> Result<()> {
        self.refresh(key).await.map(|_| ())
    }

    /// Drop the previous context's slot and load the next one.
    ///
    /// Used when the client switches team or locale.
    pub async fn switch_context(
        &mut self,
        previous: &CacheKey,
        next: &CacheKey,
    ) -> Result<&[ResolvedTranslation]> {
        if previous != next {
            self.invalidate(previous);
        }
        self.refresh(next).await
    }

    /// Drop one slot. Returns whether it was populated.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every locale slot for a team. Returns the number removed.
    pub fn invalidate_team(&mut self, team_id: Option<&str>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| key.team_id.as_deref() != team_id);
        before - self.slots.len()
    }

    /// Drop every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Display string for one key.
    ///
    /// Uses the resolved value for the slot's locale; otherwise walks the
    /// locale fallback chain over the winning entry's values; otherwise the
    /// key path itself.
    pub async fn translate(
        &mut self,
        key: &CacheKey,
        namespace: &str,
        key_path: &str,
    ) -> Result<String> {
        let locale = key.locale.clone();
        let registry = self.registry.clone();
        let rows = self.get(key).await?;

        let found = rows
            .iter()
            .find(|row| row.namespace == namespace && row.key_path == key_path);
        let text = match found {
            Some(row) => row
                .value
                .clone()
                .or_else(|| registry.localize(&row.entry.values, &locale).map(str::to_string)),
            None => None,
        };
        Ok(text.unwrap_or_else(|| key_path.to_string()))
    }

    async fn populate(&mut self, key: &CacheKey) -> Result<()> {
        let rows = self.source.load(key).await?;
        debug!(
            "Cached {} translations for {:?}/{}",
            rows.len(),
            key.team_id,
            key.locale
        );
        self.slots.insert(key.clone(), rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use crate::i18n::entry::{values, EntryFilter, NewEntry};
    use crate::i18n::resolver::resolve_listing;
    use crate::i18n::store::{EntryStore, MemoryStore};
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Loads straight from a store and counts loads.
    struct CountingSource {
        store: Arc<MemoryStore>,
        loads: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(store: Arc<MemoryStore>) -> Self {
            Self {
                store,
                loads: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationSource for CountingSource {
        async fn load(&self, key: &CacheKey) -> Result<Vec<ResolvedTranslation>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslationError::Store("offline".to_string()));
            }
            let system = self.store.find(&EntryFilter::system()).await?;
            let team = match &key.team_id {
                Some(team) => self.store.find(&EntryFilter::team(team)).await?,
                None => Vec::new(),
            };
            Ok(resolve_listing(system, team, Some(&key.locale)))
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(NewEntry::system(
                "buttons.save",
                values([("en", "Save"), ("nl", "Opslaan")]),
            ))
            .await
            .expect("seed");
        store
            .insert(NewEntry::system("buttons.close", values([("en", "Close")])))
            .await
            .expect("seed");
        store
            .insert(NewEntry::team("T1", "buttons.save", values([("en", "Store")])))
            .await
            .expect("seed");
        store
    }

    #[tokio::test]
    #[serial]
    async fn test_first_read_populates_then_serves_from_memory() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());
        let key = CacheKey::team("T1", "en");

        assert!(!cache.is_cached(&key));
        assert_eq!(cache.get(&key).await.expect("get").len(), 2);
        assert_eq!(cache.get(&key).await.expect("get").len(), 2);

        assert!(cache.is_cached(&key));
        assert_eq!(cache.source().loads(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_slots_are_per_team_and_locale() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());

        cache.get(&CacheKey::team("T1", "en")).await.expect("get");
        cache.get(&CacheKey::team("T1", "nl")).await.expect("get");
        cache.get(&CacheKey::team("T2", "en")).await.expect("get");

        assert_eq!(cache.source().loads(), 3);
    }

    #[tokio::test]
    #[serial]
    async fn test_translate_uses_team_override_and_fallbacks() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());

        let en = CacheKey::team("T1", "en");
        assert_eq!(cache.translate(&en, "ui", "buttons.save").await.expect("t"), "Store");

        let nl = CacheKey::team("T1", "nl");
        assert_eq!(cache.translate(&nl, "ui", "buttons.save").await.expect("t"), "Opslaan");
        // No nl anywhere: locale fallback over the system entry's values.
        assert_eq!(cache.translate(&nl, "ui", "buttons.close").await.expect("t"), "Close");
        // Unknown key: the key path itself.
        assert_eq!(cache.translate(&nl, "ui", "buttons.nope").await.expect("t"), "buttons.nope");
    }

    #[tokio::test]
    #[serial]
    async fn test_after_write_reloads_eagerly() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store.clone()), LocaleRegistry::default());
        let key = CacheKey::team("T1", "en");

        assert_eq!(cache.translate(&key, "ui", "buttons.close").await.expect("t"), "Close");

        store
            .insert(NewEntry::team("T1", "buttons.close", values([("en", "Shut")])))
            .await
            .expect("write");
        // Still the cached view until the write is reported.
        assert_eq!(cache.translate(&key, "ui", "buttons.close").await.expect("t"), "Close");

        cache.after_write(&key).await.expect("refresh");
        assert_eq!(cache.source().loads(), 2);
        assert!(cache.peek(&key).is_some());
        assert_eq!(cache.translate(&key, "ui", "buttons.close").await.expect("t"), "Shut");
        assert_eq!(cache.source().loads(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_invalidation() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());

        cache.get(&CacheKey::team("T1", "en")).await.expect("get");
        cache.get(&CacheKey::team("T1", "nl")).await.expect("get");
        cache.get(&CacheKey::team("T2", "en")).await.expect("get");

        assert!(cache.invalidate(&CacheKey::team("T2", "en")));
        assert!(!cache.invalidate(&CacheKey::team("T2", "en")));
        assert_eq!(cache.invalidate_team(Some("T1")), 2);
        assert!(cache.peek(&CacheKey::team("T1", "en")).is_none());

        cache.get(&CacheKey::team("T1", "en")).await.expect("reload");
        assert_eq!(cache.source().loads(), 4);

        cache.clear();
        assert!(!cache.is_cached(&CacheKey::team("T1", "en")));
    }

    #[tokio::test]
    #[serial]
    async fn test_switch_context_drops_previous_slot() {
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());
        let en = CacheKey::team("T1", "en");
        let nl = CacheKey::team("T1", "nl");

        cache.get(&en).await.expect("get");
        let rows = cache.switch_context(&en, &nl).await.expect("switch");
        assert_eq!(rows.len(), 2);

        assert!(!cache.is_cached(&en));
        assert!(cache.is_cached(&nl));
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_load_leaves_slot_empty() {
        let store = seeded().await;
        let mut source = CountingSource::new(store);
        source.fail = true;
        let mut cache = TranslationCache::new(source, LocaleRegistry::default());
        let key = CacheKey::team("T1", "en");

        assert!(cache.get(&key).await.is_err());
        assert!(!cache.is_cached(&key));
    }

    #[tokio::test]
    #[serial]
    async fn test_hits_and_misses_are_counted() {
        let metrics = TranslationMetrics::global();
        metrics.reset();
        let store = seeded().await;
        let mut cache =
            TranslationCache::new(CountingSource::new(store), LocaleRegistry::default());
        let key = CacheKey::team("T1", "en");

        cache.get(&key).await.expect("miss");
        cache.get(&key).await.expect("hit");
        cache.refresh(&key).await.expect("refresh");

        assert_eq!(metrics.cache_misses(), 1);
        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_refreshes(), 1);
    }
}
