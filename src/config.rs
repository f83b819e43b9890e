use crate::i18n::{LocaleCorpus, LocaleRegistry, DEFAULT_CHUNK_SIZE, DEFAULT_NAMESPACE};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,

    // Locale files
    pub locales_dir: PathBuf,
    pub locales: Vec<String>,
    pub canonical_locale: String,
    pub corpus_namespace: String,

    // Bulk operations
    pub import_chunk_size: usize,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Storage
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:translations.db".to_string()),

            // Locale files
            locales_dir: std::env::var("LOCALES_DIR")
                .unwrap_or_else(|_| "locales".to_string())
                .into(),
            locales: parse_locales(
                &std::env::var("LOCALES").unwrap_or_else(|_| "en,nl,fr".to_string()),
            ),
            canonical_locale: std::env::var("CANONICAL_LOCALE")
                .unwrap_or_else(|_| "en".to_string()),
            corpus_namespace: std::env::var("CORPUS_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string()),

            // Bulk operations
            import_chunk_size: std::env::var("IMPORT_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size: &usize| *size > 0)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
        };

        // Fail at startup rather than on the first write.
        config.locale_registry()?;
        Ok(config)
    }

    /// The configured locales with the canonical one marked.
    pub fn locale_registry(&self) -> Result<LocaleRegistry> {
        LocaleRegistry::from_codes(&self.locales, &self.canonical_locale).with_context(|| {
            format!(
                "Invalid locale configuration (LOCALES={}, CANONICAL_LOCALE={})",
                self.locales.join(","),
                self.canonical_locale
            )
        })
    }

    /// The locale file directory as a corpus.
    pub fn corpus(&self) -> LocaleCorpus {
        LocaleCorpus::new(&self.locales_dir)
    }
}

fn parse_locales(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "DATABASE_URL",
        "LOCALES_DIR",
        "LOCALES",
        "CANONICAL_LOCALE",
        "CORPUS_NAMESPACE",
        "IMPORT_CHUNK_SIZE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().expect("defaults are valid");

        assert_eq!(config.database_url, "sqlite:translations.db");
        assert_eq!(config.locales_dir, PathBuf::from("locales"));
        assert_eq!(config.locales, vec!["en", "nl", "fr"]);
        assert_eq!(config.canonical_locale, "en");
        assert_eq!(config.corpus_namespace, "ui");
        assert_eq!(config.import_chunk_size, 25);
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_env();
        std::env::set_var("LOCALES", " nl , de ,");
        std::env::set_var("CANONICAL_LOCALE", "nl");
        std::env::set_var("IMPORT_CHUNK_SIZE", "100");
        std::env::set_var("CORPUS_NAMESPACE", "pos");

        let config = Config::from_env().expect("valid");
        assert_eq!(config.locales, vec!["nl", "de"]);
        assert_eq!(config.locale_registry().expect("registry").canonical().code, "nl");
        assert_eq!(config.import_chunk_size, 100);
        assert_eq!(config.corpus_namespace, "pos");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_chunk_size_falls_back() {
        clear_env();
        std::env::set_var("IMPORT_CHUNK_SIZE", "lots");
        assert_eq!(Config::from_env().expect("valid").import_chunk_size, 25);

        std::env::set_var("IMPORT_CHUNK_SIZE", "0");
        assert_eq!(Config::from_env().expect("valid").import_chunk_size, 25);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_canonical_locale_must_be_configured() {
        clear_env();
        std::env::set_var("CANONICAL_LOCALE", "de");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_parse_locales_skips_blanks() {
        assert_eq!(parse_locales("en,,fr"), vec!["en", "fr"]);
        assert!(parse_locales("").is_empty());
    }
}
