//! File-backed store - a JSON object of string values on disk.
//!
//! Plays the role browser local storage plays for a web client: state
//! survives restarts and belongs to one machine/user.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use quota_core::ports::{KeyValueStore, StoreError};
use tempfile::NamedTempFile;

type Entries = BTreeMap<String, String>;

/// JSON file store.
///
/// Each write goes to its own temp file in the target directory that is then
/// renamed over the target, so readers see either the old or the new contents.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw file contents, `None` when the file does not exist yet.
    fn read_raw(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn parse(raw: &str) -> Result<Entries, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(raw)
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        let raw = self
            .read_raw()
            .map_err(|e| StoreError::Read(format!("{}: {e}", self.path.display())))?;

        match raw {
            Some(raw) => Self::parse(&raw)
                .map_err(|e| StoreError::Read(format!("{}: {e}", self.path.display()))),
            None => Ok(Entries::new()),
        }
    }

    /// Entries to rewrite from. Unparsable JSON is replaced wholesale; an
    /// I/O failure aborts the write so other keys are never dropped.
    fn entries_for_update(&self) -> Result<Entries, StoreError> {
        let raw = self
            .read_raw()
            .map_err(|e| StoreError::Write(format!("{}: {e}", self.path.display())))?;

        let Some(raw) = raw else {
            return Ok(Entries::new());
        };

        Ok(Self::parse(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Store file corrupt, overwriting");
            Entries::new()
        }))
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StoreError::Write(e.to_string()))?;

        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // One temp file per write, so concurrent writers never share it
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::Write(format!("{}: {e}", dir.display())))?;
        tmp.write_all(raw.as_bytes())
            .map_err(|e| StoreError::Write(format!("{}: {e}", tmp.path().display())))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e.error)))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let mut entries = self.entries_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let mut entries = self.entries_for_update()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
