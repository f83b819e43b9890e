//! Locale file access: `<dir>/<locale>.json`, one nested object per locale.

use crate::error::{Result, TranslationError};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocaleCorpus {
    dir: PathBuf,
}

impl LocaleCorpus {
    /// A corpus rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The corpus directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `<locale>.json` file.
    pub fn path_for(&self, locale: &str) -> PathBuf {
        self.dir.join(format!("{}.json", locale))
    }

    /// Read and parse a locale file. `Ok(None)` when the file does not exist.
    pub async fn read_tree(&self, locale: &str) -> Result<Option<Value>> {
        let path = self.path_for(locale);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Locale file {} does not exist", path.display());
                return Ok(None);
            }
            Err(e) => return Err(io_error(locale, &path, e.to_string())),
        };

        let tree: Value = serde_json::from_str(&raw)
            .map_err(|e| io_error(locale, &path, format!("invalid JSON: {}", e)))?;
        if !tree.is_object() {
            return Err(io_error(locale, &path, "root must be a JSON object".to_string()));
        }
        Ok(Some(tree))
    }

    /// Read a locale file, treating a missing file as an empty tree.
    pub async fn read_tree_or_empty(&self, locale: &str) -> Result<Value> {
        Ok(self
            .read_tree(locale)
            .await?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Write a tree as pretty JSON. The file is replaced via rename so readers
    /// never observe a half-written file.
    pub async fn write_tree(&self, locale: &str, tree: &Value) -> Result<()> {
        let path = self.path_for(locale);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(locale, &path, format!("cannot create directory: {}", e)))?;

        let mut body = serde_json::to_string_pretty(tree)?;
        body.push('\n');

        let tmp = self.dir.join(format!(".{}.json.tmp", locale));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(locale, &tmp, e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(locale, &path, e.to_string()))?;

        debug!("Wrote locale file {}", path.display());
        Ok(())
    }
}

fn io_error(locale: &str, path: &Path, message: String) -> TranslationError {
    TranslationError::CorpusIo {
        locale: locale.to_string(),
        path: path.display().to_string(),
        message,
    }
}
