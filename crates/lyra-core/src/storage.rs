//! Durable key-value storage for the player state.
//!
//! The store writes one serialized blob under a fixed key after every
//! mutation and reads it back on start. [`FileStorage`] keeps each key in its
//! own JSON file under a directory; [`MemoryStorage`] keeps everything in
//! memory for tests and embedders that persist elsewhere.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Key-value storage with string values.
#[cfg_attr(test, mockall::automock)]
pub trait StateStorage: Send {
    /// Read the value for `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the value exists but cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value for `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the value exists but cannot be removed.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Storage backed by one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    /// Open storage in `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        if !directory.exists() {
            fs::create_dir_all(&directory).map_err(|e| {
                Error::storage_error(
                    directory.display().to_string(),
                    format!("Failed to create storage directory: {e}"),
                )
            })?;
        }
        debug!("File storage at {}", directory.display());
        Ok(Self { directory })
    }

    /// Directory holding the stored files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file that holds `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

impl StateStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_error(
                key,
                format!("Failed to read {}: {e}", path.display()),
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        // The target file is only ever replaced whole.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            Error::storage_error(key, format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            Error::storage_error(key, format!("Failed to replace {}: {e}", path.display()))
        })?;
        trace!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_error(
                key,
                format!("Failed to remove {}: {e}", path.display()),
            )),
        }
    }
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, key: &str) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::storage_error(key, "Memory storage lock poisoned"))
    }
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock(key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock(key)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock(key)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.get("player-storage").unwrap(), None);
        storage.set("player-storage", r#"{"a":1}"#).unwrap();
        assert_eq!(
            storage.get("player-storage").unwrap(),
            Some(r#"{"a":1}"#.to_string())
        );

        storage.set("player-storage", r#"{"a":2}"#).unwrap();
        assert_eq!(
            storage.get("player-storage").unwrap(),
            Some(r#"{"a":2}"#.to_string())
        );
        assert!(!storage.path_for("player-storage").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.directory(), nested.as_path());
    }

    #[test]
    fn test_file_storage_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        // Removing again is fine.
        storage.remove("k").unwrap();
    }

    #[test]
    fn test_path_for_sanitizes_key() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let path = storage.path_for("../evil key");
        assert_eq!(path, dir.path().join("___evil_key.json"));
    }

    #[test]
    fn test_memory_storage_shared_between_clones() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.set("k", "v").unwrap();
        assert_eq!(clone.get("k").unwrap(), Some("v".to_string()));
        clone.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }
}
