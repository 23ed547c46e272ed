//! Durable key/value storage for the resume cursor.
//!
//! The store is scoped to one sheet: the default file lives next to the
//! sheet it tracks, so unrelated jobs never share properties.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// String properties addressed by key.
pub trait CheckpointStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// `<sheet>.checkpoint.json`
pub fn default_checkpoint_path(sheet_path: &Path) -> PathBuf {
    let mut name = sheet_path.as_os_str().to_owned();
    name.push(".checkpoint.json");
    PathBuf::from(name)
}

/// On-disk layout of [`JsonFileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default)]
    properties: BTreeMap<String, String>,
    /// Last mutation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Properties persisted as a JSON file, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: CheckpointFile,
}

impl JsonFileStore {
    /// Open the store. A missing file is an empty store; an unreadable or
    /// malformed file is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse checkpoint {}", path.display()))?
        } else {
            log::debug!("No checkpoint at {}, starting empty", path.display());
            CheckpointFile::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.state.updated_at
    }

    fn persist(&mut self) -> Result<()> {
        self.state.updated_at = Some(chrono::Utc::now());
        let json =
            serde_json::to_string_pretty(&self.state).context("failed to serialize checkpoint")?;
        crate::atomic::replace_file(&self.path, json.as_bytes())
    }
}

impl CheckpointStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.properties.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.state
            .properties
            .insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.state.properties.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// In-memory store that counts mutations.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    properties: BTreeMap<String, String>,
    mutations: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`delete` calls so far, including no-op deletes.
    pub fn mutations(&self) -> usize {
        self.mutations
    }
}

impl CheckpointStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.properties.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.mutations += 1;
        self.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.mutations += 1;
        self.properties.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_sits_next_to_sheet() {
        assert_eq!(
            default_checkpoint_path(Path::new("data/leads.csv")),
            PathBuf::from("data/leads.csv.checkpoint.json")
        );
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("cp.json")).unwrap();
        assert_eq!(store.get("nextRow").unwrap(), None);
        assert!(store.updated_at().is_none());
    }

    #[test]
    fn set_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("nextRow", "17").unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("nextRow").unwrap().as_deref(), Some("17"));
        assert!(store.updated_at().is_some());
    }

    #[test]
    fn delete_removes_key_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("nextRow", "17").unwrap();
        store.set("other", "x").unwrap();
        store.delete("nextRow").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("nextRow").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn delete_absent_key_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.delete("nextRow").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse checkpoint"));
    }

    #[test]
    fn memory_store_counts_mutations() {
        let mut store = MemoryStore::new();
        store.set("k", "1").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.mutations(), 3);
    }
}
