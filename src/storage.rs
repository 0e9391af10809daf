//! Key/value persistence for preferences and chat history
//!
//! This module provides:
//! - A `KeyValueStore` seam shared by settings and history
//! - File-backed storage under the platform data dir for native builds
//! - Browser `localStorage` for WASM builds
//! - In-memory storage for tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[cfg(not(target_arch = "wasm32"))]
use std::{fs, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create storage directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write to storage: {0}")]
    Write(std::io::Error),

    #[error("Failed to delete from storage: {0}")]
    Delete(std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Browser storage unavailable: {0}")]
    Browser(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String key/value storage with localStorage semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

// ============================================
// In-memory backend
// ============================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

// ============================================
// Browser backend (WASM)
// ============================================

/// Key used in `localStorage`. The default namespace keeps bare keys.
pub fn browser_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() || namespace == "default" {
        key.to_string()
    } else {
        format!("{}:{key}", sanitize_key(namespace))
    }
}

/// `window.localStorage`, looked up per call since `web_sys` handles are not `Send`.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    namespace: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    fn storage() -> StorageResult<web_sys::Storage> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Browser("no window".to_string()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Browser("localStorage disabled".to_string())),
            Err(err) => Err(StorageError::Browser(format!("{err:?}"))),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()
            .ok()?
            .get_item(&browser_key(&self.namespace, key))
            .ok()
            .flatten()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::storage()?
            .set_item(&browser_key(&self.namespace, key), value)
            .map_err(|err| StorageError::Browser(format!("{err:?}")))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        Self::storage()?
            .remove_item(&browser_key(&self.namespace, key))
            .map_err(|err| StorageError::Browser(format!("{err:?}")))
    }
}

// ============================================
// File backend (native platforms)
// ============================================

#[cfg(not(target_arch = "wasm32"))]
pub struct FileStore {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<data dir>/calavera/<namespace>`.
    pub fn for_namespace(namespace: &str) -> Self {
        let safe = sanitize_key(namespace);
        if let Some(data_dir) = dirs::data_local_dir() {
            return Self::new(data_dir.join("calavera").join(safe));
        }
        Self::new(PathBuf::from("cache").join(safe))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.root).map_err(StorageError::CreateDir)?;
        fs::write(self.path_for(key), value).map_err(StorageError::Write)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path).map_err(StorageError::Delete)?;
        }
        Ok(())
    }
}

/// The store the app persists into on this platform.
#[cfg(not(target_arch = "wasm32"))]
pub fn default_store(namespace: &str) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::for_namespace(namespace))
}

#[cfg(target_arch = "wasm32")]
pub fn default_store(namespace: &str) -> Arc<dyn KeyValueStore> {
    Arc::new(LocalStorageStore::new(namespace))
}

/// Sanitize storage key for filesystem use
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}
