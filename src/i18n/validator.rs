//! Write-time validation for translation entries.
//!
//! Storage accepts any row that satisfies the uniqueness constraint; the
//! checks here are the usage-level rules applied before a write is accepted
//! (key path shape, required fields, presence of the required locale).

use crate::error::TranslationError;
use crate::i18n::entry::{non_empty_value, LocaleValues, NewEntry};
use crate::i18n::registry::LocaleRegistry;
use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that block the write
    pub errors: Vec<String>,

    /// Non-blocking observations (unknown locales, blank optional values)
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether any blocking problem was found.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any non-blocking problem was found.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Neither errors nor warnings.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Convert into a `Validation` error when any error was recorded.
    pub fn into_result(self, key_path: &str) -> Result<Vec<String>, TranslationError> {
        if self.has_errors() {
            Err(TranslationError::Validation {
                key_path: key_path.to_string(),
                reasons: self.errors,
            })
        } else {
            Ok(self.warnings)
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for entry writes.
pub struct EntryValidator;

static SEGMENT_REGEX: OnceLock<Regex> = OnceLock::new();

impl EntryValidator {
    /// Validate a new entry.
    ///
    /// `required_locale` is enforced when `Some`; system-scope writes pass the
    /// canonical locale, team overrides pass `None`.
    pub fn validate_new(
        entry: &NewEntry,
        registry: &LocaleRegistry,
        required_locale: Option<&str>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::check_key_path(&entry.key_path, &mut report);

        if entry.namespace.trim().is_empty() {
            report.errors.push("namespace is required".to_string());
        }
        if entry.category.trim().is_empty() {
            report.errors.push("category is required".to_string());
        }

        Self::check_values(&entry.values, registry, required_locale, &mut report);
        report
    }

    /// Validate a replacement value map on update.
    pub fn validate_values(
        values: &LocaleValues,
        registry: &LocaleRegistry,
        required_locale: Option<&str>,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        Self::check_values(values, registry, required_locale, &mut report);
        report
    }

    /// Check that a single key segment is non-empty, dot-free and has no
    /// surrounding whitespace.
    ///
    /// Locale file importers apply the same rule to object keys, so every
    /// imported key path can also be overridden.
    pub fn is_valid_segment(segment: &str) -> bool {
        let regex = SEGMENT_REGEX.get_or_init(|| {
            Regex::new(r"^[^.\s](?:[^.]*[^.\s])?$").expect("Invalid regex")
        });
        regex.is_match(segment)
    }

    /// Check that a key path is a dot-delimited list of valid segments.
    pub fn is_valid_key_path(key_path: &str) -> bool {
        key_path.split('.').all(Self::is_valid_segment)
    }

    fn check_key_path(key_path: &str, report: &mut ValidationReport) {
        if key_path.trim().is_empty() {
            report.errors.push("keyPath is required".to_string());
        } else if !Self::is_valid_key_path(key_path) {
            report.errors.push(format!(
                "keyPath '{}' must be dot-separated, non-empty, trimmed segments",
                key_path
            ));
        }
    }

    fn check_values(
        values: &LocaleValues,
        registry: &LocaleRegistry,
        required_locale: Option<&str>,
        report: &mut ValidationReport,
    ) {
        if values.is_empty() {
            report.errors.push("values must contain at least one locale".to_string());
            return;
        }

        if let Some(required) = required_locale {
            if non_empty_value(values, required).is_none() {
                report
                    .errors
                    .push(format!("a '{}' value is required", required));
            }
        }

        for (locale, value) in values {
            if !registry.is_enabled(locale) {
                report
                    .warnings
                    .push(format!("locale '{}' is not configured", locale));
            }
            if value.trim().is_empty() && Some(locale.as_str()) != required_locale {
                report
                    .warnings
                    .push(format!("value for '{}' is blank", locale));
            }
        }
    }
}
