//! Durable session storage.
//!
//! Three key-value slots survive reloads: the last committed document, the
//! selected language, and the access-gate flag. [`FsStorage`] keeps one file
//! per slot under a data directory; [`MemoryStorage`] keeps them in memory and
//! can be told to fail, for exercising non-fatal persistence paths.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::PersistenceError;

/// A durable storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Last committed document JSON.
    Document,
    /// Selected language code.
    Language,
    /// Whether the access gate was passed.
    Authorized,
}

impl StorageKey {
    /// Slot name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Language => "language",
            Self::Authorized => "authorized",
        }
    }
}

/// Key-value store for session state.
#[async_trait]
pub trait SessionStorage: Send + Sync + std::fmt::Debug {
    /// Read a slot; `None` when it was never written.
    async fn get(&self, key: StorageKey) -> Result<Option<String>, PersistenceError>;

    /// Write a slot.
    async fn set(&self, key: StorageKey, value: &str) -> Result<(), PersistenceError>;

    /// Clear a slot. Clearing an empty slot succeeds.
    async fn remove(&self, key: StorageKey) -> Result<(), PersistenceError>;
}

/// Read the access-gate flag.
///
/// # Errors
///
/// Propagates storage read failures.
pub async fn is_authorized(storage: &dyn SessionStorage) -> Result<bool, PersistenceError> {
    Ok(storage
        .get(StorageKey::Authorized)
        .await?
        .is_some_and(|v| v.trim() == "true"))
}

/// Write the access-gate flag.
///
/// # Errors
///
/// Propagates storage write failures.
pub async fn set_authorized(storage: &dyn SessionStorage, authorized: bool) -> Result<(), PersistenceError> {
    if authorized {
        storage.set(StorageKey::Authorized, "true").await
    } else {
        storage.remove(StorageKey::Authorized).await
    }
}

/// One file per slot under a data directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    data_dir: PathBuf,
}

impl FsStorage {
    /// Create a store rooted at `data_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(Self { data_dir })
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    fn path_for(&self, key: StorageKey) -> PathBuf {
        let extension = match key {
            StorageKey::Document => "json",
            StorageKey::Language | StorageKey::Authorized => "txt",
        };
        self.data_dir.join(format!("{}.{extension}", key.as_str()))
    }
}

#[async_trait]
impl SessionStorage for FsStorage {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), PersistenceError> {
        // Atomic replace: write a sibling file, then rename over the slot.
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Persisted {} to {}", key.as_str(), path.display());
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store with optional failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<RwLock<HashMap<StorageKey, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Read a slot synchronously, bypassing failure injection.
    #[must_use]
    pub fn peek(&self, key: StorageKey) -> Option<String> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("storage is failing".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, PersistenceError> {
        self.check()?;
        Ok(self.peek(key))
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> Result<(), PersistenceError> {
        self.check()?;
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FsStorage::open(dir.path().join("data")).await.expect("open");

        assert_eq!(storage.get(StorageKey::Document).await.expect("get"), None);
        storage.set(StorageKey::Document, "{\"a\":1}").await.expect("set");
        storage.set(StorageKey::Language, "fr").await.expect("set");

        assert_eq!(
            storage.get(StorageKey::Document).await.expect("get").as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("data").join("document.json").exists());
        assert!(!dir.path().join("data").join("document.tmp").exists());
    }

    #[tokio::test]
    async fn test_fs_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let storage = FsStorage::open(dir.path()).await.expect("open");
            storage.set(StorageKey::Language, "ru").await.expect("set");
        }
        let storage = FsStorage::open(dir.path()).await.expect("reopen");
        assert_eq!(
            storage.get(StorageKey::Language).await.expect("get").as_deref(),
            Some("ru")
        );
    }

    #[tokio::test]
    async fn test_fs_remove_missing_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FsStorage::open(dir.path()).await.expect("open");
        storage.remove(StorageKey::Authorized).await.expect("remove");
    }

    #[tokio::test]
    async fn test_authorized_flag() {
        let storage = MemoryStorage::new();
        assert!(!is_authorized(&storage).await.expect("read"));
        set_authorized(&storage, true).await.expect("set");
        assert!(is_authorized(&storage).await.expect("read"));
        set_authorized(&storage, false).await.expect("clear");
        assert!(!is_authorized(&storage).await.expect("read"));
    }

    #[tokio::test]
    async fn test_memory_storage_failure_injection() {
        let storage = MemoryStorage::new();
        storage.set(StorageKey::Language, "id").await.expect("set");
        storage.set_failing(true);

        assert!(matches!(
            storage.set(StorageKey::Language, "fr").await,
            Err(PersistenceError::Unavailable(_))
        ));
        assert_eq!(storage.peek(StorageKey::Language).as_deref(), Some("id"));

        storage.set_failing(false);
        assert!(storage.get(StorageKey::Language).await.is_ok());
    }
}
