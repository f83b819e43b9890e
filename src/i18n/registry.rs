//! Locale registry: the configured locales and the content-side fallback chain.
//!
//! The registry decides *which locale* of an already-chosen entry is shown.
//! Choosing *which entry* (team or system) is the resolver's job; the two
//! fallbacks never mix.

use crate::i18n::entry::{non_empty_value, LocaleValues};
use anyhow::{bail, Result};

/// Configuration for a supported locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Locale code as used for file names and value keys (e.g., "en", "nl")
    pub code: String,

    /// English name of the locale (e.g., "Dutch")
    pub name: String,

    /// Whether this is the canonical/source locale (exactly one must be true)
    pub is_canonical: bool,

    /// Whether this locale is enabled for use
    pub enabled: bool,
}

impl LocaleConfig {
    /// An enabled, non-canonical locale.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            is_canonical: false,
            enabled: true,
        }
    }

    /// Mark this locale as the canonical one.
    pub fn canonical(mut self) -> Self {
        self.is_canonical = true;
        self
    }

    /// Keep the locale configured but disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The set of configured locales, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
    canonical: usize,
}

impl LocaleRegistry {
    /// Build a registry.
    ///
    /// # Errors
    /// Fails when there is not exactly one canonical locale, when the
    /// canonical locale is disabled, or when a code appears twice.
    pub fn new(locales: Vec<LocaleConfig>) -> Result<Self> {
        let canonical: Vec<usize> = locales
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_canonical)
            .map(|(i, _)| i)
            .collect();

        let canonical = match canonical.as_slice() {
            [] => bail!("No canonical locale configured"),
            [index] => *index,
            _ => bail!("Multiple canonical locales configured"),
        };
        if !locales[canonical].enabled {
            bail!("Canonical locale '{}' is disabled", locales[canonical].code);
        }
        for (i, locale) in locales.iter().enumerate() {
            if locales[..i].iter().any(|other| other.code == locale.code) {
                bail!("Locale '{}' configured twice", locale.code);
            }
        }

        Ok(Self { locales, canonical })
    }

    /// Build a registry from bare codes, marking `canonical` as the source locale.
    pub fn from_codes<S: AsRef<str>>(codes: &[S], canonical: &str) -> Result<Self> {
        let locales = codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                let config = LocaleConfig::new(code, display_name(code));
                if code == canonical {
                    config.canonical()
                } else {
                    config
                }
            })
            .collect();
        Self::new(locales)
    }

    /// Get a locale configuration by code, enabled or not.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// All enabled locales in registry order.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|l| l.enabled).collect()
    }

    /// Codes of all enabled locales, in configuration order.
    pub fn codes(&self) -> Vec<&str> {
        self.list_enabled().into_iter().map(|l| l.code.as_str()).collect()
    }

    /// The canonical locale; system entries must carry a value for it.
    pub fn canonical(&self) -> &LocaleConfig {
        &self.locales[self.canonical]
    }

    /// Whether `code` is configured and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code).is_some_and(|l| l.enabled)
    }

    /// Locales to try for `requested`: the requested code first, then every
    /// enabled locale in configuration order.
    pub fn fallback_chain<'a>(&'a self, requested: &'a str) -> Vec<&'a str> {
        let mut chain = vec![requested];
        for code in self.codes() {
            if code != requested {
                chain.push(code);
            }
        }
        chain
    }

    /// First non-empty value along the fallback chain for `requested`.
    pub fn localize<'v>(&self, values: &'v LocaleValues, requested: &str) -> Option<&'v str> {
        self.fallback_chain(requested)
            .into_iter()
            .find_map(|code| non_empty_value(values, code))
    }
}

impl Default for LocaleRegistry {
    /// English (canonical), Dutch and French.
    fn default() -> Self {
        Self {
            locales: vec![
                LocaleConfig::new("en", "English").canonical(),
                LocaleConfig::new("nl", "Dutch"),
                LocaleConfig::new("fr", "French"),
            ],
            canonical: 0,
        }
    }
}

fn display_name(code: &str) -> String {
    match code {
        "en" => "English",
        "nl" => "Dutch",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        other => other,
    }
    .to_string()
}
