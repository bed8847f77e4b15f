//! Key-value backends.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

/// String-keyed JSON value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a key.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a key.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete a key.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Batched read, one slot per requested key.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Value>>, StoreError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }
}

/// In-memory store for tests and ephemeral runs.
pub struct MemoryKvStore {
    entries: tokio::sync::RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: tokio::sync::RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON file per key under a base directory.
pub struct FileKvStore {
    base_dir: PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at `base_dir`, creating it if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        debug!("FileKvStore initialized at {:?}", base_dir);
        Ok(Self { base_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", Self::sanitize_key(key)))
    }

    /// Sanitize a key for use as a file name.
    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.key_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let content = serde_json::to_string_pretty(&value)?;
        fs::write(&path, content).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryKvStore::new();
        store.set("a", json!({"n": 1})).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(json!({"n": 1})));
        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_many_preserves_slots() {
        let store = MemoryKvStore::new();
        store.set("a", json!(1)).await.unwrap();
        store.set("c", json!(3)).await.unwrap();

        let values = store.get_many(&["a", "b", "c"]).await.unwrap();
        assert_eq!(values, vec![Some(json!(1)), None, Some(json!(3))]);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileKvStore::new(dir.path()).await.unwrap();

        store.set("cq:v2:host/c/abc", json!({"queue": []})).await.unwrap();
        assert_eq!(
            store.get("cq:v2:host/c/abc").await.unwrap(),
            Some(json!({"queue": []}))
        );

        store.remove("cq:v2:host/c/abc").await.unwrap();
        assert_eq!(store.get("cq:v2:host/c/abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_missing_key_and_remove_are_clean() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileKvStore::new(dir.path()).await.unwrap();

        assert_eq!(store.get("absent").await.unwrap(), None);
        store.remove("absent").await.unwrap();
    }
}
