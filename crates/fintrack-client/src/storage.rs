//! Durable access-token storage.
//!
//! A single string slot: present means signed in, absent means logged out.
//! [`TokenStore`] pairs the durable slot with an in-memory copy so request
//! construction never touches the disk.

use crate::error::ClientError;
use parking_lot::{Mutex, RwLock};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Backend of the token slot.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, ClientError>;
    fn store(&self, token: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Process-local slot. Used by tests and for ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        Ok(self.slot.lock().clone())
    }

    fn store(&self, token: &str) -> Result<(), ClientError> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Token kept in a single file; writes go through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn store(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Storage(format!("Failed to create dir: {}", e)))?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, token)
            .map_err(|e| ClientError::Storage(format!("Failed to write temp file: {}", e)))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| ClientError::Storage(format!("Failed to rename file: {}", e)))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!("Failed to remove token: {}", e))),
        }
    }
}

/// Current access token: memory copy plus durable slot.
///
/// Shared (`Arc`) by the HTTP client, the session store, and telemetry. Only
/// the client and the session store write to it.
pub struct TokenStore {
    current: RwLock<Option<String>>,
    storage: Arc<dyn TokenStorage>,
}

impl TokenStore {
    /// Seed the memory copy from durable storage. A read failure starts logged out.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let initial = storage.load().unwrap_or_else(|e| {
            tracing::warn!("Could not read persisted token: {}", e);
            None
        });
        Self { current: RwLock::new(initial), storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    pub fn get(&self) -> Option<String> {
        self.current.read().clone()
    }

    pub fn is_present(&self) -> bool {
        self.current.read().is_some()
    }

    /// Persist a new token. The memory copy is updated even if the durable write fails.
    pub fn set(&self, token: &str) {
        *self.current.write() = Some(token.to_string());
        if let Err(e) = self.storage.store(token) {
            tracing::warn!("Failed to persist access token: {}", e);
        }
    }

    pub fn clear(&self) {
        *self.current.write() = None;
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Failed to clear persisted token: {}", e);
        }
    }

    pub fn storage(&self) -> &Arc<dyn TokenStorage> {
        &self.storage
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("present", &self.is_present()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested").join("token"));

        assert_eq!(storage.load().unwrap(), None);
        storage.store("tok1").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok1"));
        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().unwrap();
    }

    #[test]
    fn test_token_store_seeds_from_storage() {
        let storage = Arc::new(MemoryTokenStorage::with_token("persisted"));
        let store = TokenStore::new(storage.clone());
        assert_eq!(store.get().as_deref(), Some("persisted"));

        store.set("fresh");
        assert_eq!(storage.load().unwrap().as_deref(), Some("fresh"));

        store.clear();
        assert!(!store.is_present());
        assert_eq!(storage.load().unwrap(), None);
    }
}
