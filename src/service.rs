//! Operation surface for the translation subsystem.
//!
//! [`TranslationService`] wires the store, locale files and reporting views
//! together and performs the capability checks in front of each operation.
//! Transport layers (HTTP, CLI) call into this and nothing below it.

use crate::access::{AccessControl, Actor, TeamDirectory};
use crate::error::{Result, TranslationError};
use crate::i18n::{
    resolve_listing, BatchReport, BulkAddReport, CacheKey, CorpusExporter, CorpusImporter,
    EntryFilter, EntryPatch, EntryStore, EntryValidator, Interrupt, LocaleCorpus, LocaleRegistry,
    LocaleValues, NewEntry, OverrideCount, OverrideRegistry, Resolution, ResolvedTranslation,
    Resolver, SyncReport, TeamOverride, TranslationEntry, TranslationSource, DEFAULT_CHUNK_SIZE,
    DEFAULT_NAMESPACE,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// A team's request to override (or add) one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    pub namespace: String,
    pub key_path: String,
    pub values: LocaleValues,
    pub description: Option<String>,
    /// Materialize a system default from `values` when none exists yet.
    pub create_missing_system: bool,
}

impl OverrideRequest {
    /// Request an override of `key_path` in the default namespace.
    pub fn new(key_path: impl Into<String>, values: LocaleValues) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            key_path: key_path.into(),
            values,
            description: None,
            create_missing_system: false,
        }
    }

    /// Target a namespace other than the default one.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Create the system default from these values when it is missing.
    pub fn create_missing_system(mut self) -> Self {
        self.create_missing_system = true;
        self
    }
}

/// Capability-checked entry point for every translation operation.
pub struct TranslationService {
    store: Arc<dyn EntryStore>,
    access: Arc<dyn AccessControl>,
    teams: Arc<dyn TeamDirectory>,
    registry: LocaleRegistry,
    corpus: LocaleCorpus,
    corpus_namespace: String,
    chunk_size: usize,
    interrupt: Interrupt,
}

impl TranslationService {
    /// Create a service with the default namespace, chunk size and a fresh interrupt.
    pub fn new(
        store: Arc<dyn EntryStore>,
        access: Arc<dyn AccessControl>,
        teams: Arc<dyn TeamDirectory>,
        registry: LocaleRegistry,
        corpus: LocaleCorpus,
    ) -> Self {
        Self {
            store,
            access,
            teams,
            registry,
            corpus,
            corpus_namespace: DEFAULT_NAMESPACE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            interrupt: Interrupt::new(),
        }
    }

    /// Namespace the locale files map to.
    pub fn with_corpus_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.corpus_namespace = namespace.into();
        self
    }

    /// Set how many rows a full import inserts per batch.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Share an existing interrupt flag.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Locales this service validates and resolves against.
    pub fn registry(&self) -> &LocaleRegistry {
        &self.registry
    }

    /// Raise to stop a running import or merge between items.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    // ==================== Capability checks ====================

    async fn require_system_admin(&self, actor: &Actor, action: &str) -> Result<()> {
        if self.access.is_system_admin(actor).await {
            Ok(())
        } else {
            Err(TranslationError::forbidden(format!(
                "{} requires system admin",
                action
            )))
        }
    }

    async fn require_team_admin(&self, actor: &Actor, team_id: &str) -> Result<()> {
        if self.access.is_team_admin(actor, team_id).await {
            Ok(())
        } else {
            Err(TranslationError::forbidden(format!(
                "not an admin of team '{}'",
                team_id
            )))
        }
    }

    async fn require_team_member(&self, actor: &Actor, team_id: &str) -> Result<()> {
        if self.access.is_team_member(actor, team_id).await {
            Ok(())
        } else {
            Err(TranslationError::forbidden(format!(
                "not a member of team '{}'",
                team_id
            )))
        }
    }

    /// System rows need a system admin; team rows need an admin of the owning team.
    async fn require_owner_admin(&self, actor: &Actor, entry: &TranslationEntry) -> Result<()> {
        match entry.team_id.as_deref() {
            Some(team) => self.require_team_admin(actor, team).await,
            None => self.require_system_admin(actor, "changing system translations").await,
        }
    }

    /// Load a row for mutation, hiding rows outside `expected_team`.
    async fn load_owned(&self, id: &str, expected_team: Option<&str>) -> Result<TranslationEntry> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TranslationError::not_found(id))?;
        match expected_team {
            Some(team) if entry.team_id.as_deref() != Some(team) => {
                Err(TranslationError::not_found(id))
            }
            _ => Ok(entry),
        }
    }

    /// Team scope needs a real id; an empty one would alias the system scope.
    fn check_team_id(team_id: &str, key_path: &str) -> Result<()> {
        if team_id.trim().is_empty() {
            return Err(TranslationError::Validation {
                key_path: key_path.to_string(),
                reasons: vec!["teamId must not be empty".to_string()],
            });
        }
        Ok(())
    }

    fn log_warnings(key_path: &str, warnings: Vec<String>) {
        for warning in warnings {
            warn!("Translation '{}': {}", key_path, warning);
        }
    }

    // ==================== Reads ====================

    /// Resolve one key; a team lookup requires membership of that team.
    pub async fn resolve(
        &self,
        actor: &Actor,
        team_id: Option<&str>,
        namespace: &str,
        key_path: &str,
        locale: &str,
    ) -> Result<Resolution> {
        if let Some(team) = team_id {
            Self::check_team_id(team, key_path)?;
            self.require_team_member(actor, team).await?;
        }
        Resolver::new(self.store.as_ref())
            .resolve(team_id, namespace, key_path, locale)
            .await
    }

    /// All system-scope entries.
    pub async fn list_system(&self, _actor: &Actor) -> Result<Vec<TranslationEntry>> {
        self.store.find(&EntryFilter::system()).await
    }

    /// The team's own rows, without system defaults.
    pub async fn list_team(&self, actor: &Actor, team_id: &str) -> Result<Vec<TranslationEntry>> {
        self.require_team_member(actor, team_id).await?;
        self.store.find(&EntryFilter::team(team_id)).await
    }

    /// One row per key present at system or team scope, with the winner picked.
    pub async fn list_team_with_system_fallback(
        &self,
        actor: &Actor,
        team_id: &str,
        locale: Option<&str>,
    ) -> Result<Vec<ResolvedTranslation>> {
        self.require_team_member(actor, team_id).await?;
        self.effective_translations(Some(team_id), locale).await
    }

    async fn effective_translations(
        &self,
        team_id: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<ResolvedTranslation>> {
        let system = self.store.find(&EntryFilter::system()).await?;
        let team = match team_id {
            Some(team) => self.store.find(&EntryFilter::team(team)).await?,
            None => Vec::new(),
        };
        Ok(resolve_listing(system, team, locale))
    }

    // ==================== Writes ====================

    /// Create a system default. Requires system admin and the canonical locale.
    pub async fn create_system(&self, actor: &Actor, entry: NewEntry) -> Result<TranslationEntry> {
        self.require_system_admin(actor, "creating system translations")
            .await?;
        if entry.team_id.is_some() {
            return Err(TranslationError::Validation {
                key_path: entry.key_path,
                reasons: vec!["system translations cannot carry a teamId".to_string()],
            });
        }

        let canonical = self.registry.canonical().code.as_str();
        let warnings = EntryValidator::validate_new(&entry, &self.registry, Some(canonical))
            .into_result(&entry.key_path)?;
        Self::log_warnings(&entry.key_path, warnings);

        let created = self.store.insert(entry).await?;
        info!(
            "Created system translation {}:{}",
            created.namespace, created.key_path
        );
        Ok(created)
    }

    /// Create or update a team's override of one key.
    ///
    /// The overrideable check and the write are separate store calls; a
    /// concurrent writer can still win the insert, which surfaces as
    /// `DuplicateKey`.
    pub async fn create_team_override(
        &self,
        actor: &Actor,
        team_id: &str,
        request: OverrideRequest,
    ) -> Result<TranslationEntry> {
        Self::check_team_id(team_id, &request.key_path)?;
        self.require_team_admin(actor, team_id).await?;

        let mut candidate = NewEntry::team(team_id, &request.key_path, request.values.clone())
            .with_namespace(&request.namespace);
        candidate.description = request.description.clone();
        let warnings = EntryValidator::validate_new(&candidate, &self.registry, None)
            .into_result(&request.key_path)?;
        Self::log_warnings(&request.key_path, warnings);

        let system = match self
            .store
            .find_one(None, &request.namespace, &request.key_path)
            .await?
        {
            None if request.create_missing_system => {
                Some(self.materialize_system_default(&request).await?)
            }
            system => system,
        };
        if system.as_ref().is_some_and(|s| !s.is_overrideable) {
            return Err(TranslationError::forbidden(format!(
                "'{}:{}' cannot be overridden",
                request.namespace, request.key_path
            )));
        }

        let existing = self
            .store
            .find_one(Some(team_id), &request.namespace, &request.key_path)
            .await?;
        match existing {
            Some(entry) => {
                let mut values = entry.values.clone();
                values.extend(request.values);
                let patch = EntryPatch {
                    values: Some(values),
                    description: request.description.map(Some),
                    ..EntryPatch::default()
                };
                let updated = self.store.update(&entry.id, patch).await?;
                info!(
                    "Updated override {}:{} for team '{}'",
                    updated.namespace, updated.key_path, team_id
                );
                Ok(updated)
            }
            None => {
                let created = self.store.insert(candidate).await?;
                info!(
                    "Created override {}:{} for team '{}'",
                    created.namespace, created.key_path, team_id
                );
                Ok(created)
            }
        }
    }

    async fn materialize_system_default(
        &self,
        request: &OverrideRequest,
    ) -> Result<TranslationEntry> {
        let mut entry = NewEntry::system(&request.key_path, request.values.clone())
            .with_namespace(&request.namespace);
        entry.description = request.description.clone();

        let canonical = self.registry.canonical().code.as_str();
        EntryValidator::validate_new(&entry, &self.registry, Some(canonical))
            .into_result(&request.key_path)?;

        match self.store.insert(entry).await {
            Ok(created) => {
                info!(
                    "Created missing system default {}:{}",
                    created.namespace, created.key_path
                );
                Ok(created)
            }
            // Another writer created it between our lookup and insert.
            Err(e) if e.is_duplicate() => self
                .store
                .find_one(None, &request.namespace, &request.key_path)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    /// Patch one row. With `expected_team`, rows outside that team read as missing.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        patch: EntryPatch,
        expected_team: Option<&str>,
    ) -> Result<TranslationEntry> {
        let entry = self.load_owned(id, expected_team).await?;
        self.require_owner_admin(actor, &entry).await?;

        if let Some(values) = &patch.values {
            let required = entry
                .is_system()
                .then(|| self.registry.canonical().code.as_str());
            let warnings = EntryValidator::validate_values(values, &self.registry, required)
                .into_result(&entry.key_path)?;
            Self::log_warnings(&entry.key_path, warnings);
        }
        if patch.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(TranslationError::Validation {
                key_path: entry.key_path,
                reasons: vec!["category is required".to_string()],
            });
        }

        self.store.update(id, patch).await
    }

    /// Delete one row, with the same ownership rules as `update`.
    pub async fn delete(&self, actor: &Actor, id: &str, expected_team: Option<&str>) -> Result<()> {
        let entry = self.load_owned(id, expected_team).await?;
        self.require_owner_admin(actor, &entry).await?;

        if !self.store.delete(id).await? {
            return Err(TranslationError::not_found(id));
        }
        info!(
            "Deleted translation {}:{} ({:?})",
            entry.namespace, entry.key_path, entry.team_id
        );
        Ok(())
    }

    // ==================== Corpus ====================

    fn importer(&self) -> CorpusImporter<'_> {
        CorpusImporter::new(self.store.as_ref(), &self.corpus, &self.registry)
            .with_namespace(&self.corpus_namespace)
            .with_chunk_size(self.chunk_size)
            .with_interrupt(self.interrupt.clone())
    }

    /// Replace the corpus namespace with the locale files.
    pub async fn import_from_files(&self, actor: &Actor) -> Result<BatchReport> {
        self.require_system_admin(actor, "importing locale files").await?;
        self.importer().import().await
    }

    /// Merge the locale files into system entries without deleting.
    pub async fn merge_from_files(&self, actor: &Actor) -> Result<BatchReport> {
        self.require_system_admin(actor, "merging locale files").await?;
        self.importer().merge().await
    }

    /// Write system entries back to the locale files.
    pub async fn sync_to_files(&self, actor: &Actor) -> Result<SyncReport> {
        self.require_system_admin(actor, "syncing locale files").await?;
        CorpusExporter::new(self.store.as_ref(), &self.corpus, &self.registry)
            .with_namespace(&self.corpus_namespace)
            .sync()
            .await
    }

    /// Add system entries, skipping keys that already exist.
    pub async fn bulk_add(&self, actor: &Actor, entries: Vec<NewEntry>) -> Result<BulkAddReport> {
        self.require_system_admin(actor, "bulk adding translations").await?;
        self.importer().bulk_add(entries).await
    }

    // ==================== Reporting ====================

    fn overrides(&self) -> OverrideRegistry<'_> {
        OverrideRegistry::new(self.store.as_ref(), self.teams.as_ref())
    }

    /// System entries teams are allowed to override.
    pub async fn overrideable_system_entries(
        &self,
        _actor: &Actor,
    ) -> Result<Vec<TranslationEntry>> {
        self.overrides().overrideable_system_entries().await
    }

    /// Every team override of one key, with team names.
    pub async fn overrides_for(
        &self,
        actor: &Actor,
        key_path: &str,
        namespace: &str,
    ) -> Result<Vec<TeamOverride>> {
        self.require_system_admin(actor, "listing team overrides").await?;
        self.overrides().team_overrides_for(key_path, namespace).await
    }

    /// System entries with the number of team overrides each has.
    pub async fn system_entries_with_override_counts(
        &self,
        actor: &Actor,
    ) -> Result<Vec<OverrideCount>> {
        self.require_system_admin(actor, "counting overrides").await?;
        self.overrides().system_entries_with_override_counts().await
    }
}

/// Feeds a [`crate::i18n::TranslationCache`] from the service on behalf of one actor.
///
/// A key without a team loads the system-only view.
pub struct ServiceSource {
    service: Arc<TranslationService>,
    actor: Actor,
}

impl ServiceSource {
    /// Load cache slots through `service` as `actor`.
    pub fn new(service: Arc<TranslationService>, actor: Actor) -> Self {
        Self { service, actor }
    }
}

#[async_trait]
impl TranslationSource for ServiceSource {
    async fn load(&self, key: &CacheKey) -> Result<Vec<ResolvedTranslation>> {
        match key.team_id.as_deref() {
            Some(team) => {
                self.service
                    .list_team_with_system_fallback(&self.actor, team, Some(&key.locale))
                    .await
            }
            None => {
                self.service
                    .effective_translations(None, Some(&key.locale))
                    .await
            }
        }
    }
}
