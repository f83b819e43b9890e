//! Error taxonomy for translation operations.

use thiserror::Error;

/// Errors surfaced by the translation store, resolver and corpus tooling.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Required fields are missing or a required locale is absent.
    #[error("invalid translation '{key_path}': {}", reasons.join("; "))]
    Validation {
        key_path: String,
        reasons: Vec<String>,
    },

    /// At most one entry may exist per (team, namespace, key path).
    #[error(
        "translation '{namespace}:{key_path}' already exists for {}",
        scope_label(team_id.as_deref())
    )]
    DuplicateKey {
        team_id: Option<String>,
        namespace: String,
        key_path: String,
    },

    #[error("translation '{id}' not found")]
    NotFound { id: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A locale file could not be read, parsed or written.
    #[error("locale file error for '{locale}' ({path}): {message}")]
    CorpusIo {
        locale: String,
        path: String,
        message: String,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn scope_label(team_id: Option<&str>) -> String {
    match team_id {
        Some(team) => format!("team '{}'", team),
        None => "system scope".to_string(),
    }
}

impl TranslationError {
    /// Build a `Forbidden` error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Build a `NotFound` error for an entry id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// True for conflicts that merge-style callers treat as "already exists".
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

impl From<sqlx::Error> for TranslationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TranslationError>;
