//! Single-slot persistence of the latest scan result
//!
//! `ResultStore` keeps two keys in a `KeyValueStore`: the latest scan id and
//! the serialized metrics of that scan. Each save replaces both at once.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::bloom_home;
use crate::error::StoreError;
use crate::metrics::RawMetrics;

pub const LATEST_SCAN_ID: &str = "latest_scan_id";
pub const LATEST_ANALYSIS_DATA: &str = "latest_analysis_data";

const STATE_FILE: &str = "state.json";

/// String key/value storage that survives restarts
pub trait KeyValueStore: Send + Sync {
  /// Read several keys from one snapshot, in the order given
  fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError>;

  /// Write every entry in one step; readers see all of them or none
  fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError>;

  fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError>;

  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.get_many(&[key])?.pop().flatten())
  }

  fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
    self.set_many(&[(key, value)])
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.remove_many(&[key])
  }
}

/// JSON file store rooted at a directory.
///
/// The whole map is rewritten on each change through a temp file in the same
/// directory followed by a rename.
pub struct FileStore {
  root: PathBuf,
  lock: Mutex<()>,
}

impl FileStore {
  /// Open (creating if needed) a store in `root`
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let root = root.into();
    std::fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
    Ok(Self { root, lock: Mutex::new(()) })
  }

  /// Store under `BLOOM_HOME`, else the platform data directory
  pub fn default_location() -> Result<Self, StoreError> {
    Self::open(bloom_home()?)
  }

  pub fn path(&self) -> PathBuf {
    self.root.join(STATE_FILE)
  }

  fn guard(&self) -> MutexGuard<'_, ()> {
    self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
    let path = self.path();
    let contents = match std::fs::read_to_string(&path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
      Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_str(&contents).map_err(|e| StoreError::corrupt(STATE_FILE, e.to_string()))
  }

  fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(map)?;

    let mut temp = NamedTempFile::new_in(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
    temp.write_all(json.as_bytes()).map_err(|e| StoreError::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| StoreError::io(temp.path(), e))?;
    temp.persist(self.path()).map_err(|e| StoreError::io(self.path(), e.error))?;

    Ok(())
  }
}

impl KeyValueStore for FileStore {
  fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
    let _guard = self.guard();
    let mut map = self.read_map()?;
    Ok(keys.iter().map(|key| map.remove(*key)).collect())
  }

  fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
    let _guard = self.guard();
    let mut map = self.read_map()?;
    for (key, value) in entries {
      map.insert(key.to_string(), value.clone());
    }
    self.write_map(&map)
  }

  fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
    let _guard = self.guard();
    let mut map = self.read_map()?;
    let before = map.len();
    map.retain(|key, _| !keys.contains(&key.as_str()));
    if map.len() == before {
      return Ok(());
    }
    self.write_map(&map)
  }
}

/// In-process store, for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl KeyValueStore for MemoryStore {
  fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
    let map = self.entries();
    Ok(keys.iter().map(|key| map.get(*key).cloned()).collect())
  }

  fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
    let mut map = self.entries();
    for (key, value) in entries {
      map.insert(key.to_string(), value.clone());
    }
    Ok(())
  }

  fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
    let mut map = self.entries();
    for key in keys {
      map.remove(*key);
    }
    Ok(())
  }
}

/// The one result kept between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedResult {
  pub scan_id: String,
  pub metrics: RawMetrics,
}

#[derive(Clone)]
pub struct ResultStore {
  inner: Arc<dyn KeyValueStore>,
}

impl ResultStore {
  pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
    Self { inner }
  }

  /// Replace the stored result
  pub fn save(&self, result: &PersistedResult) -> Result<(), StoreError> {
    let data = serde_json::to_string(&result.metrics)?;
    self.inner.set_many(&[(LATEST_SCAN_ID, result.scan_id.clone()), (LATEST_ANALYSIS_DATA, data)])
  }

  /// The stored result, or `None` when nothing has been saved yet
  pub fn load(&self) -> Result<Option<PersistedResult>, StoreError> {
    let mut slot = self.inner.get_many(&[LATEST_SCAN_ID, LATEST_ANALYSIS_DATA])?.into_iter();
    let (Some(Some(scan_id)), Some(Some(data))) = (slot.next(), slot.next()) else {
      return Ok(None);
    };

    let metrics = serde_json::from_str(&data)
      .map_err(|e| StoreError::corrupt(LATEST_ANALYSIS_DATA, e.to_string()))?;

    Ok(Some(PersistedResult { scan_id, metrics }))
  }

  pub fn clear(&self) -> Result<(), StoreError> {
    self.inner.remove_many(&[LATEST_SCAN_ID, LATEST_ANALYSIS_DATA])
  }
}
