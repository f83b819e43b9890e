//! Override Registry: read-only reporting views over the store.

use crate::access::TeamDirectory;
use crate::error::Result;
use crate::i18n::entry::{EntryFilter, TranslationEntry};
use crate::i18n::store::EntryStore;
use serde::Serialize;
use std::collections::HashMap;

/// A team-scope entry with its team's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverride {
    pub entry: TranslationEntry,
    /// Team display name; the team id when the directory has none.
    pub team_name: String,
}

/// A system entry annotated with how many teams override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideCount {
    pub entry: TranslationEntry,
    pub override_count: usize,
}

pub struct OverrideRegistry<'a> {
    store: &'a dyn EntryStore,
    teams: &'a dyn TeamDirectory,
}

impl<'a> OverrideRegistry<'a> {
    /// Reporting views over `store`, naming teams through `teams`.
    pub fn new(store: &'a dyn EntryStore, teams: &'a dyn TeamDirectory) -> Self {
        Self { store, teams }
    }

    /// System entries that teams are allowed to override.
    pub async fn overrideable_system_entries(&self) -> Result<Vec<TranslationEntry>> {
        self.store
            .find(&EntryFilter::system().overrideable(true))
            .await
    }

    /// Every team's override of `(namespace, key_path)`.
    pub async fn team_overrides_for(
        &self,
        key_path: &str,
        namespace: &str,
    ) -> Result<Vec<TeamOverride>> {
        let entries = self
            .store
            .find(&EntryFilter::any_team().namespace(namespace).key_path(key_path))
            .await?;

        let mut names: HashMap<String, String> = HashMap::new();
        let mut overrides = Vec::with_capacity(entries.len());
        for entry in entries {
            let team_id = entry.team_id.clone().unwrap_or_default();
            let team_name = match names.get(&team_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .teams
                        .team_name(&team_id)
                        .await?
                        .unwrap_or_else(|| team_id.clone());
                    names.insert(team_id, name.clone());
                    name
                }
            };
            overrides.push(TeamOverride { entry, team_name });
        }
        Ok(overrides)
    }

    /// All system entries with the number of team rows sharing their key.
    pub async fn system_entries_with_override_counts(&self) -> Result<Vec<OverrideCount>> {
        let system = self.store.find(&EntryFilter::system()).await?;

        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        for entry in self.store.find(&EntryFilter::any_team()).await? {
            *counts.entry((entry.namespace, entry.key_path)).or_default() += 1;
        }

        Ok(system
            .into_iter()
            .map(|entry| {
                let override_count = counts
                    .get(&(entry.namespace.clone(), entry.key_path.clone()))
                    .copied()
                    .unwrap_or(0);
                OverrideCount {
                    entry,
                    override_count,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::entry::{values, NewEntry};
    use crate::i18n::store::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for entry in [
            NewEntry::system("buttons.save", values([("en", "Save")])),
            NewEntry::system("legal.terms", values([("en", "Terms")])).overrideable(false),
            NewEntry::team("t1", "buttons.save", values([("en", "Store")])),
            NewEntry::team("t2", "buttons.save", values([("en", "Keep")])),
            NewEntry::team("t2", "buttons.save", values([("en", "Other ns")]))
                .with_namespace("pos"),
            NewEntry::team("t1", "adhoc.only", values([("en", "Team only")])),
        ] {
            store.insert(entry).await.expect("seed");
        }
        store
    }

    fn directory() -> HashMap<String, String> {
        [("t1".to_string(), "Bakery".to_string())].into_iter().collect()
    }

    #[tokio::test]
    async fn test_overrideable_system_entries() {
        let store = seeded().await;
        let teams = directory();
        let entries = OverrideRegistry::new(&store, &teams)
            .overrideable_system_entries()
            .await
            .expect("query");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key_path, "buttons.save");
    }

    #[tokio::test]
    async fn test_team_overrides_for_joins_names() {
        let store = seeded().await;
        let teams = directory();
        let overrides = OverrideRegistry::new(&store, &teams)
            .team_overrides_for("buttons.save", "ui")
            .await
            .expect("query");

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].team_name, "Bakery");
        assert_eq!(overrides[0].entry.value_for("en"), Some("Store"));
        assert_eq!(overrides[1].team_name, "t2");
    }

    #[tokio::test]
    async fn test_override_counts_across_teams() {
        let store = seeded().await;
        let teams = directory();
        let counts = OverrideRegistry::new(&store, &teams)
            .system_entries_with_override_counts()
            .await
            .expect("query");

        let by_key: HashMap<_, _> = counts
            .iter()
            .map(|c| (c.entry.key_path.as_str(), c.override_count))
            .collect();
        assert_eq!(by_key.len(), 2);
        assert_eq!(by_key["buttons.save"], 2);
        assert_eq!(by_key["legal.terms"], 0);
    }

    #[tokio::test]
    async fn test_views_do_not_mutate() {
        let store = seeded().await;
        let teams = directory();
        let before = store.len();
        let registry = OverrideRegistry::new(&store, &teams);
        registry.overrideable_system_entries().await.expect("query");
        registry.team_overrides_for("buttons.save", "ui").await.expect("query");
        registry.system_entries_with_override_counts().await.expect("query");
        assert_eq!(store.len(), before);
    }
}
