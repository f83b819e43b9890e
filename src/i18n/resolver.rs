//! Resolution Engine: picks the winning entry for a lookup.
//!
//! Order, first match wins:
//! 1. the team's own entry, if it has a non-empty value for the locale
//! 2. the system entry, if it has a non-empty value for the locale
//! 3. nothing: the key path itself is returned as a visible marker
//!
//! Only the requested locale is consulted. Trying other locales is the
//! consumer's concern (see [`crate::i18n::LocaleRegistry::localize`]).

use crate::error::Result;
use crate::i18n::entry::TranslationEntry;
use crate::i18n::metrics::TranslationMetrics;
use crate::i18n::store::EntryStore;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Team,
    System,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub source: Source,
    pub value: String,
    /// The winning entry. For `Source::None` this is the most specific entry
    /// that exists for the key (team, else system), if any.
    pub entry: Option<TranslationEntry>,
}

impl Resolution {
    /// True when neither scope had a value.
    pub fn is_missing(&self) -> bool {
        self.source == Source::None
    }
}

/// Pick between already-loaded team and system rows for one key.
///
/// This is the pure core of [`Resolver::resolve`]; listing operations use it
/// to resolve many keys without a store round trip per key.
pub fn pick(
    team_entry: Option<&TranslationEntry>,
    system_entry: Option<&TranslationEntry>,
    key_path: &str,
    locale: &str,
) -> Resolution {
    if let Some(entry) = team_entry {
        if let Some(value) = entry.value_for(locale) {
            return Resolution {
                source: Source::Team,
                value: value.to_string(),
                entry: Some(entry.clone()),
            };
        }
    }

    if let Some(entry) = system_entry {
        if let Some(value) = entry.value_for(locale) {
            return Resolution {
                source: Source::System,
                value: value.to_string(),
                entry: Some(entry.clone()),
            };
        }
    }

    Resolution {
        source: Source::None,
        value: key_path.to_string(),
        entry: team_entry.or(system_entry).cloned(),
    }
}

/// One key of a team's effective translation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTranslation {
    pub namespace: String,
    pub key_path: String,
    pub source: Source,
    /// Value for the requested locale; `None` when unresolved or when no
    /// locale was requested.
    pub value: Option<String>,
    /// The winning entry, or the most specific candidate when unresolved.
    pub entry: TranslationEntry,
    /// False only when the system entry forbids overrides.
    pub is_overrideable: bool,
    /// Whether the team has its own row for this key.
    pub has_override: bool,
}

/// Resolve every key present at team or system scope.
///
/// With a locale, each key follows the same rules as [`pick`]. Without one,
/// the team row wins whenever it exists.
pub fn resolve_listing(
    system_entries: Vec<TranslationEntry>,
    team_entries: Vec<TranslationEntry>,
    locale: Option<&str>,
) -> Vec<ResolvedTranslation> {
    type Pair = (Option<TranslationEntry>, Option<TranslationEntry>);
    let mut keys: BTreeMap<(String, String), Pair> = BTreeMap::new();
    for entry in system_entries {
        let slot = keys
            .entry((entry.namespace.clone(), entry.key_path.clone()))
            .or_default();
        slot.1 = Some(entry);
    }
    for entry in team_entries {
        let slot = keys
            .entry((entry.namespace.clone(), entry.key_path.clone()))
            .or_default();
        slot.0 = Some(entry);
    }

    keys.into_iter()
        .filter_map(|((namespace, key_path), (team, system))| {
            let is_overrideable = system.as_ref().is_none_or(|s| s.is_overrideable);
            let has_override = team.is_some();

            let (source, value, entry) = match locale {
                Some(locale) => {
                    let resolution = pick(team.as_ref(), system.as_ref(), &key_path, locale);
                    let value = (!resolution.is_missing()).then_some(resolution.value);
                    (resolution.source, value, resolution.entry?)
                }
                None => match (team, system) {
                    (Some(team), _) => (Source::Team, None, team),
                    (None, Some(system)) => (Source::System, None, system),
                    (None, None) => return None,
                },
            };

            Some(ResolvedTranslation {
                namespace,
                key_path,
                source,
                value,
                entry,
                is_overrideable,
                has_override,
            })
        })
        .collect()
}

/// Store-backed resolver.
pub struct Resolver<'a> {
    store: &'a dyn EntryStore,
}

impl<'a> Resolver<'a> {
    /// A resolver reading from `store`.
    pub fn new(store: &'a dyn EntryStore) -> Self {
        Self { store }
    }

    /// Resolve `(team, namespace, key_path, locale)`.
    ///
    /// A missing translation is not an error; only store failures are.
    pub async fn resolve(
        &self,
        team_id: Option<&str>,
        namespace: &str,
        key_path: &str,
        locale: &str,
    ) -> Result<Resolution> {
        let team_entry = match team_id {
            Some(team) => self.store.find_one(Some(team), namespace, key_path).await?,
            None => None,
        };

        // Skip the system lookup when the team entry already answers.
        let resolution = match team_entry.as_ref() {
            Some(entry) if entry.value_for(locale).is_some() => {
                pick(Some(entry), None, key_path, locale)
            }
            _ => {
                let system_entry = self.store.find_one(None, namespace, key_path).await?;
                pick(team_entry.as_ref(), system_entry.as_ref(), key_path, locale)
            }
        };

        debug!(
            "Resolved {}:{} [{}] for {:?} from {:?}",
            namespace, key_path, locale, team_id, resolution.source
        );
        TranslationMetrics::global().record_resolution(resolution.source);

        Ok(resolution)
    }
}
