//! Key-value snapshot storage.
//!
//! Values are JSON blobs under namespaced keys. Every operation is
//! best-effort: failures are logged and swallowed, and a value that cannot
//! be read back is reported as absent.

use crate::{Error, Result};
use fs2::FileExt;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Prefix shared by every key Wolfwalk writes
pub const STORAGE_NAMESPACE: &str = "wolfwalk_";

/// Namespaced key for `name`, e.g. `wolfwalk_session`.
pub fn storage_key(name: &str) -> String {
    format!("{}{}", STORAGE_NAMESPACE, name)
}

/// Best-effort blob storage
pub trait SnapshotStore {
    fn save(&mut self, key: &str, value: &Value);
    fn load(&self, key: &str) -> Option<Value>;
    fn clear(&mut self, key: &str);
}

/// One JSON file per key inside a directory
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Other(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Read a value with a shared lock. `Ok(None)` if the file does not exist.
    pub fn try_load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Atomically replace a value.
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the old file.
    pub fn try_save(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(value)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    pub fn try_clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SnapshotStore for FileStore {
    fn save(&mut self, key: &str, value: &Value) {
        if let Err(e) = self.try_save(key, value) {
            tracing::warn!("Failed to save {}: {}", key, e);
        }
    }

    fn load(&self, key: &str) -> Option<Value> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to load {}: {}. Treating as absent.", key, e);
                None
            }
        }
    }

    fn clear(&mut self, key: &str) {
        if let Err(e) = self.try_clear(key) {
            tracing::warn!("Failed to clear {}: {}", key, e);
        }
    }
}

/// In-memory store holding serialized strings. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, like a full or disabled browser store.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Put a raw string under `key`, bypassing serialization.
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, key: &str, value: &Value) {
        if self.unavailable {
            tracing::warn!("Failed to save {}: storage unavailable", key);
            return;
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn load(&self, key: &str) -> Option<Value> {
        let raw = self.entries.borrow().get(key).cloned()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}. Treating as absent.", key, e);
                None
            }
        }
    }

    fn clear(&mut self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}
