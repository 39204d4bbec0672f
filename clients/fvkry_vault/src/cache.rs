// src/cache.rs
// Versioned snapshot cache for dashboard and vault data

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::{fs, io::ErrorKind};

use alloy_primitives::Address;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hash;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const DASHBOARD_KEY: &str = "dashboard_data";
pub const VAULT_KEY: &str = "vault_data";
/// Bumped whenever a cached value's shape changes
pub const CACHE_VERSION: u32 = 1;

/// A cached value and where it came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub version: u32,
    pub owner: Address,
    pub fetched_at: DateTime<Utc>,
    pub source_hash: String,
    pub value: T,
}

/// Why cached data is no longer valid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
    /// The owner has no vaults left
    NoVaults,
    Disconnected,
    OwnerChanged,
}

/// Raw key/value persistence under the cache
pub trait SnapshotStore {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, contents: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside `dir`
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, key: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), contents)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Typed, owner-scoped view over a [`SnapshotStore`].
///
/// Every store failure is logged and treated as a miss, so callers always fall back to a
/// fresh fetch.
pub struct SnapshotCache {
    store: Box<dyn SnapshotStore>,
}

impl SnapshotCache {
    pub fn new(store: Box<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.read(key) {
            Ok(contents) => contents,
            Err(e) => {
                msg!("Cache read of {} failed: {}", key, e);
                None
            }
        }
    }

    /// Entry for `owner` under `key`, if present, current and parsable
    pub fn get<T: DeserializeOwned>(&self, key: &str, owner: Address) -> Option<CacheEntry<T>> {
        let raw = self.read_raw(key)?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                msg!("Discarding unreadable {} snapshot: {}", key, e);
                return None;
            }
        };
        if entry.version != CACHE_VERSION || entry.owner != owner {
            msg!("Discarding stale {} snapshot", key);
            return None;
        }
        Some(entry)
    }

    /// Stores `value` and reports whether its content differs from what was cached
    pub fn put<T: Serialize>(&mut self, key: &str, owner: Address, value: &T, now: DateTime<Utc>) -> bool {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                msg!("Cannot snapshot {}: {}", key, e);
                return false;
            }
        };
        let source_hash = hash(serialized.as_bytes()).to_string();
        let changed = self
            .get::<serde_json::Value>(key, owner)
            .map_or(true, |previous| previous.source_hash != source_hash);

        let entry = CacheEntry {
            version: CACHE_VERSION,
            owner,
            fetched_at: now,
            source_hash,
            value,
        };
        match serde_json::to_string(&entry) {
            Ok(contents) => {
                if let Err(e) = self.store.write(key, &contents) {
                    msg!("Cache write of {} failed: {}", key, e);
                }
            }
            Err(e) => msg!("Cannot snapshot {}: {}", key, e),
        }
        changed
    }

    pub fn remove(&mut self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            msg!("Cache removal of {} failed: {}", key, e);
        }
    }

    pub fn invalidate(&mut self, reason: Invalidation) {
        msg!("Invalidating cache: {:?}", reason);
        match reason {
            Invalidation::NoVaults => self.remove(VAULT_KEY),
            Invalidation::Disconnected | Invalidation::OwnerChanged => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.remove(VAULT_KEY);
        self.remove(DASHBOARD_KEY);
    }
}
