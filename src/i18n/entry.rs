//! Translation entry data model.
//!
//! A single persisted entity, [`TranslationEntry`], covers both scopes: rows
//! with no `team_id` are system defaults, rows with a `team_id` are that
//! team's overrides. The pair `(team_id, namespace, key_path)` is unique.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace used when none is supplied.
pub const DEFAULT_NAMESPACE: &str = "ui";

/// Locale code -> translated string.
pub type LocaleValues = BTreeMap<String, String>;

/// Whether an entry is a system default or a team override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    System,
    Team,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub id: String,
    pub team_id: Option<String>,
    pub namespace: String,
    pub key_path: String,
    pub category: String,
    pub values: LocaleValues,
    pub description: Option<String>,
    pub is_overrideable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranslationEntry {
    pub fn scope(&self) -> Scope {
        match self.team_id {
            Some(_) => Scope::Team,
            None => Scope::System,
        }
    }

    /// True for rows without a team.
    pub fn is_system(&self) -> bool {
        self.team_id.is_none()
    }

    /// Value for `locale`, treating blank strings as absent.
    pub fn value_for(&self, locale: &str) -> Option<&str> {
        non_empty_value(&self.values, locale)
    }

    /// Whether this row belongs to the given scope (`None` = system).
    pub fn belongs_to(&self, team_id: Option<&str>) -> bool {
        self.team_id.as_deref() == team_id
    }
}

/// Look up a locale in a value map, ignoring blank strings.
pub fn non_empty_value<'a>(values: &'a LocaleValues, locale: &str) -> Option<&'a str> {
    values
        .get(locale)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Category derived from a key path: its first segment.
pub fn category_for(key_path: &str) -> String {
    key_path.split('.').next().unwrap_or_default().to_string()
}

/// An entry about to be inserted; `id` and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub team_id: Option<String>,
    pub namespace: String,
    pub key_path: String,
    pub category: String,
    pub values: LocaleValues,
    pub description: Option<String>,
    pub is_overrideable: bool,
}

impl NewEntry {
    /// A system-scope entry in the default namespace with a derived category.
    pub fn system(key_path: impl Into<String>, values: LocaleValues) -> Self {
        let key_path = key_path.into();
        Self {
            team_id: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            category: category_for(&key_path),
            key_path,
            values,
            description: None,
            is_overrideable: true,
        }
    }

    /// A team-scope entry in the default namespace with a derived category.
    pub fn team(
        team_id: impl Into<String>,
        key_path: impl Into<String>,
        values: LocaleValues,
    ) -> Self {
        Self {
            team_id: Some(team_id.into()),
            ..Self::system(key_path, values)
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set whether teams may override this entry.
    pub fn overrideable(mut self, is_overrideable: bool) -> Self {
        self.is_overrideable = is_overrideable;
        self
    }

    pub fn scope(&self) -> Scope {
        match self.team_id {
            Some(_) => Scope::Team,
            None => Scope::System,
        }
    }

    /// Materialize into a stored row.
    pub fn into_entry(self, id: String, now: DateTime<Utc>) -> TranslationEntry {
        TranslationEntry {
            id,
            team_id: self.team_id,
            namespace: self.namespace,
            key_path: self.key_path,
            category: self.category,
            values: self.values,
            description: self.description,
            is_overrideable: self.is_overrideable,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub values: Option<LocaleValues>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub is_overrideable: Option<bool>,
}

impl EntryPatch {
    /// A patch that only replaces the values map.
    pub fn values(values: LocaleValues) -> Self {
        Self {
            values: Some(values),
            ..Self::default()
        }
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.is_overrideable.is_none()
    }

    /// Apply onto an entry and refresh `updated_at`.
    pub fn apply(self, entry: &mut TranslationEntry, now: DateTime<Utc>) {
        if let Some(values) = self.values {
            entry.values = values;
        }
        if let Some(description) = self.description {
            entry.description = description;
        }
        if let Some(category) = self.category {
            entry.category = category;
        }
        if let Some(flag) = self.is_overrideable {
            entry.is_overrideable = flag;
        }
        entry.updated_at = now;
    }
}

/// Which scope(s) a query covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    Any,
    System,
    AnyTeam,
    Team(String),
}

/// Conjunctive query over entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub scope: ScopeFilter,
    pub namespace: Option<String>,
    pub key_path: Option<String>,
    pub category: Option<String>,
    pub is_overrideable: Option<bool>,
}

impl EntryFilter {
    /// Match system rows only.
    pub fn system() -> Self {
        Self {
            scope: ScopeFilter::System,
            ..Self::default()
        }
    }

    /// Match one team's rows.
    pub fn team(team_id: impl Into<String>) -> Self {
        Self {
            scope: ScopeFilter::Team(team_id.into()),
            ..Self::default()
        }
    }

    /// Match rows of every team.
    pub fn any_team() -> Self {
        Self {
            scope: ScopeFilter::AnyTeam,
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn overrideable(mut self, flag: bool) -> Self {
        self.is_overrideable = Some(flag);
        self
    }

    /// Whether `entry` passes every set condition.
    pub fn matches(&self, entry: &TranslationEntry) -> bool {
        let scope_ok = match &self.scope {
            ScopeFilter::Any => true,
            ScopeFilter::System => entry.team_id.is_none(),
            ScopeFilter::AnyTeam => entry.team_id.is_some(),
            ScopeFilter::Team(team) => entry.team_id.as_deref() == Some(team.as_str()),
        };
        scope_ok
            && self.namespace.as_ref().is_none_or(|ns| *ns == entry.namespace)
            && self.key_path.as_ref().is_none_or(|k| *k == entry.key_path)
            && self.category.as_ref().is_none_or(|c| *c == entry.category)
            && self
                .is_overrideable
                .is_none_or(|flag| flag == entry.is_overrideable)
    }
}

/// Build a [`LocaleValues`] map from pairs.
pub fn values<const N: usize>(pairs: [(&str, &str); N]) -> LocaleValues {
    pairs
        .into_iter()
        .map(|(locale, value)| (locale.to_string(), value.to_string()))
        .collect()
}
