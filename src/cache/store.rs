//! Cache storage.
//!
//! [`CacheStore`] is the key/value contract the revalidating cache is built
//! on: `get` answers found / not found, `set` may refuse a write under the
//! store's cost-based admission policy, `remove` drops superseded entries.
//! [`DiskStore`] persists entries as JSON files so cached output survives
//! between runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::entry::{CacheEntry, CacheKey, CacheValue};

/// Key/value store with an admission policy.
pub trait CacheStore: Send + Sync {
    /// Look up a key.
    fn get(&self, key: &CacheKey) -> Option<CacheValue>;

    /// Store a value with the given admission cost.
    ///
    /// Returns `false` when the store refuses the write.
    fn set(&self, key: &CacheKey, value: CacheValue, cost: i64) -> bool;

    /// Drop a key. Returns whether anything was removed.
    fn remove(&self, key: &CacheKey) -> bool;
}

impl<S: CacheStore + ?Sized> CacheStore for &S {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        (**self).get(key)
    }

    fn set(&self, key: &CacheKey, value: CacheValue, cost: i64) -> bool {
        (**self).set(key, value, cost)
    }

    fn remove(&self, key: &CacheKey) -> bool {
        (**self).remove(key)
    }
}

impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        (**self).get(key)
    }

    fn set(&self, key: &CacheKey, value: CacheValue, cost: i64) -> bool {
        (**self).set(key, value, cost)
    }

    fn remove(&self, key: &CacheKey) -> bool {
        (**self).remove(key)
    }
}

/// The part of a stored entry admission needs; the value is skipped.
#[derive(Deserialize)]
struct EntryHeader {
    key: String,
    cost: i64,
}

/// Encoded key -> cost of every entry on disk, read once per process.
#[derive(Default)]
struct CostIndex {
    loaded: bool,
    costs: HashMap<String, i64>,
}

impl CostIndex {
    fn total(&self) -> i64 {
        self.costs.values().sum()
    }

    fn used_excluding(&self, key: &str) -> i64 {
        self.costs
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, cost)| *cost)
            .sum()
    }
}

/// File-backed store, one JSON file per key.
///
/// Admission: a write is refused when the summed cost of all other entries
/// plus the new one would exceed `max_cost`. Nothing is evicted
/// automatically; superseded entries are dropped by the revalidating cache
/// through [`CacheStore::remove`], everything else by [`DiskStore::clear`].
pub struct DiskStore {
    /// Root directory for cache.
    root: PathBuf,
    max_cost: i64,
    index: Mutex<CostIndex>,
}

impl DiskStore {
    /// Create a new disk store.
    pub fn new(root: impl Into<PathBuf>, max_cost: i64) -> Self {
        Self {
            root: root.into(),
            max_cost,
            index: Mutex::new(CostIndex::default()),
        }
    }

    /// Get the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum total cost admitted.
    pub fn max_cost(&self) -> i64 {
        self.max_cost
    }

    /// Ensure the cache directory exists.
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create cache directory {:?}", self.root))
    }

    /// Get the path of the file holding `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let hash = Sha256::digest(key.encode().as_bytes());
        let hash_str = hex::encode(&hash[..16]);
        self.root.join(format!("{}.json", hash_str))
    }

    /// Load the entry stored under `key`.
    pub fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache entry {:?}", path))?;
        let entry: CacheEntry = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt cache entry {:?}", path))?;

        // A hash collision would hand back someone else's entry.
        if entry.key != key.encode() {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Write an entry unconditionally.
    ///
    /// The file is written next to its destination and renamed into place so
    /// readers never see a partial entry.
    fn save(&self, key: &CacheKey, value: CacheValue, cost: i64) -> Result<CacheEntry> {
        self.ensure_dir()?;

        let size = serde_json::to_vec(&value)?.len() as u64;
        let entry = CacheEntry::new(key, value, cost).with_size(size);
        let json = serde_json::to_string_pretty(&entry)?;

        let mut file = tempfile::NamedTempFile::new_in(&self.root)?;
        file.write_all(json.as_bytes())?;
        file.persist(self.entry_path(key))
            .with_context(|| format!("Failed to write cache entry for {}", key))?;

        Ok(entry)
    }

    /// Remove a cached entry.
    pub fn remove_entry(&self, key: &CacheKey) -> Result<bool> {
        let path = self.entry_path(key);
        let mut index = self.lock_index();

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache entry {:?}", path))?;
            index.costs.remove(&key.encode());
            return Ok(true);
        }

        Ok(false)
    }

    /// List all cached entries, newest first.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();

        for path in self.entry_files()? {
            match read_json::<CacheEntry>(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable cache entry: {:#}", e),
            }
        }

        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        Ok(entries)
    }

    /// Clear all cached entries.
    pub fn clear(&self) -> Result<usize> {
        let mut index = self.lock_index();

        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path)?;
            removed += 1;
        }

        *index = CostIndex {
            loaded: true,
            costs: HashMap::new(),
        };
        Ok(removed)
    }

    /// Sum of admission costs of all entries.
    pub fn total_cost(&self) -> Result<i64> {
        Ok(self.loaded_index()?.total())
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        self.ensure_dir()?;

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn lock_index(&self) -> MutexGuard<'_, CostIndex> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The cost index, scanning the directory on first use.
    fn loaded_index(&self) -> Result<MutexGuard<'_, CostIndex>> {
        let mut index = self.lock_index();

        if !index.loaded {
            let mut costs = HashMap::new();
            for path in self.entry_files()? {
                match read_json::<EntryHeader>(&path) {
                    Ok(header) => {
                        costs.insert(header.key, header.cost);
                    }
                    Err(e) => tracing::warn!("Not counting unreadable cache entry: {:#}", e),
                }
            }
            index.costs = costs;
            index.loaded = true;
        }

        Ok(index)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Corrupt cache entry {:?}", path))
}

impl CacheStore for DiskStore {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        match self.load(key) {
            Ok(entry) => entry.map(|e| e.value),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {:#}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &CacheKey, value: CacheValue, cost: i64) -> bool {
        if cost > self.max_cost {
            tracing::debug!("Entry {} costs more than the whole store, refusing", key);
            return false;
        }

        let mut index = match self.loaded_index() {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Cache admission check failed for {}: {:#}", key, e);
                return false;
            }
        };

        let encoded = key.encode();
        if index.used_excluding(&encoded) + cost > self.max_cost {
            tracing::debug!("Cache store at capacity, refusing {}", key);
            return false;
        }

        match self.save(key, value, cost) {
            Ok(_) => {
                index.costs.insert(encoded, cost);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write cache entry {}: {:#}", key, e);
                false
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> bool {
        match self.remove_entry(key) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("Failed to remove cache entry {}: {:#}", key, e);
                false
            }
        }
    }
}
