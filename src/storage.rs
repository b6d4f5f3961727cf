//! Key-value persistence for stats and recipe collections.
//!
//! Each key is stored as a JSON document. `FileStorage` keeps one
//! `<key>.json` file per key under ~/.local/share/smartchef/ (configurable);
//! `MemoryStorage` stands in for it in tests.

#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StorageError;

pub const GAMIFICATION_KEY: &str = "smartchef_gamification";
pub const SAVED_RECIPES_KEY: &str = "smartchef_saved_recipes";
pub const LAST_RECIPES_KEY: &str = "smartchef_last_recipes";

pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a record. Missing keys are `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.read(key)? {
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        None => Ok(None),
    }
}

/// Serialize and write a full record under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value)?;
    storage.write(key, &json)
}

/// Default data directory for persisted state.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("smartchef")
}

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        // Temp file + rename: readers only ever see complete records
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            warn!("Failed to move {} into place: {e}", tmp.display());
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Saved {key} to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail, for exercising the swallow-and-log
    /// paths.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_writes: true,
        }
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        storage
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("storage is read-only")));
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.read("nothing").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        storage.write("k", "first").unwrap();
        storage.write("k", "second").unwrap();

        assert_eq!(storage.read("k").unwrap().as_deref(), Some("second"));
        assert!(storage.dir().join("k.json").exists());
        assert!(!storage.dir().join("k.json.tmp").exists());
    }

    #[test]
    fn test_json_helpers() {
        let storage = MemoryStorage::new();
        save_json(&storage, "nums", &vec![1, 2, 3]).unwrap();
        let loaded: Option<Vec<i32>> = load_json(&storage, "nums").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_load_json_corrupt() {
        let storage = MemoryStorage::with_entry("bad", "{not json");
        let loaded: Result<Option<Vec<i32>>, _> = load_json(&storage, "bad");
        assert!(matches!(loaded, Err(StorageError::Serialize(_))));
    }

    #[test]
    fn test_failing_storage() {
        let storage = MemoryStorage::failing();
        assert!(storage.write("k", "v").is_err());
        assert!(storage.read("k").unwrap().is_none());
    }
}
