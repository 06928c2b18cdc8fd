// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Origin-scoped key/value persistence.
//!
//! Two backends:
//! - [`MemoryStorage`] for tests and embedded use
//! - [`FileStorage`], one JSON file per origin, which survives restarts

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage write failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous string key/value store.
///
/// Reads never fail: anything unreadable is reported as absent.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same map, like two tabs on one origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: std::sync::Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// File-backed storage: one JSON object per origin under a directory.
///
/// The whole map is rewritten on every write (temp file + rename), so a
/// crash leaves either the old or the new contents on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the store for `origin` inside `dir`.
    pub fn for_origin(dir: impl AsRef<Path>, origin: &str) -> Self {
        let file_name = format!("{}.json", urlencoding::encode(origin));
        Self::open(dir.as_ref().join(file_name))
    }

    /// Open the store at an explicit file path.
    pub fn open(path: PathBuf) -> Self {
        let cache = load_map(&path);
        tracing::debug!(path = %path.display(), keys = cache.len(), "Opened session storage");
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let contents = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.cache.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut cache = self.cache.write();
        let mut next = cache.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut cache = self.cache.write();
        if !cache.contains_key(key) {
            return Ok(());
        }
        let mut next = cache.clone();
        next.remove(key);
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }
}

/// Read the persisted map; a missing or unreadable file is an empty store.
fn load_map(path: &Path) -> BTreeMap<String, String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable session storage, starting empty");
            return BTreeMap::new();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Corrupt session storage, starting empty");
        BTreeMap::new()
    })
}
