//! Persistence for the client-held session token.
//!
//! SYSTEM CONTEXT
//! ==============
//! In `ClientToken` mode the auth session keeps its token here across
//! restarts, under [`TOKEN_STORAGE_KEY`]. The session is the only writer.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Key under which the token is stored.
pub const TOKEN_STORAGE_KEY: &str = "auth_token";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store is corrupt: {0}")]
    Corrupt(String),
}

/// Durable slot for the session token.
pub trait TokenStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn save(&self, token: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local store; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Arc::new(Mutex::new(Some(token.into()))) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON key/value file, the on-disk stand-in for browser `localStorage`.
///
/// Other keys in the file are preserved. A missing file reads as empty.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(map).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(TOKEN_STORAGE_KEY).filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(TOKEN_STORAGE_KEY.to_owned(), token.to_owned());
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        if map.remove(TOKEN_STORAGE_KEY).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}
