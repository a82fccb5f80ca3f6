use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::JobError;

/// Record holding the ordered list of saved jobs.
pub const HISTORY_RECORD: &str = "history";
/// Record holding the signed-in user, if any.
pub const USER_RECORD: &str = "user";

/// Directory of named JSON records, each written and read as a unit.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Read a record. `Ok(None)` if it was never written; an unreadable or
    /// mismatched record is a `PersistenceFailure`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, JobError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| JobError::Persistence {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| JobError::Persistence {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Like `load`, but a broken record is logged and treated as absent.
    pub fn load_or_absent<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.load(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring stored record: {}", e);
                None
            }
        }
    }

    /// Write a record atomically: temp file then rename, so a reader never
    /// sees a half-written file.
    pub fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path(name);
        let tmp_path = self.dir.join(format!("{}.json.tmp", name));
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}
