//! Conversation-keyed snapshot store with legacy migration.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use chatqueue_protocols::{PersistedQueueState, LEGACY_QUEUE_KEY};

use crate::error::{StoreError, StoreErrorKind};
use crate::kv::KvStore;

/// Receives store failures. Load, save and migrate failures are reported
/// independently; none of them surfaces to the queue itself.
pub type ErrorCallback = Arc<dyn Fn(StoreErrorKind, &StoreError) + Send + Sync>;

/// Queue-facing persistence API.
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
    on_error: ErrorCallback,
    /// Latch: the legacy global key is consulted at most once per store,
    /// even when the first loads race.
    legacy_checked: Mutex<bool>,
}

impl SnapshotStore {
    /// Create a store that logs failures via `tracing`.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_error_callback(
            kv,
            Arc::new(|kind, err| warn!("Snapshot {:?} failed: {}", kind, err)),
        )
    }

    /// Create a store with a custom failure callback.
    pub fn with_error_callback(kv: Arc<dyn KvStore>, on_error: ErrorCallback) -> Self {
        Self {
            kv,
            on_error,
            legacy_checked: Mutex::new(false),
        }
    }

    /// Persist a snapshot under a conversation key.
    ///
    /// Fire-and-forget from the queue's perspective: failures are routed
    /// to the error callback, except context-invalidated errors which are
    /// suppressed entirely (the page outlived an extension reload and
    /// will simply stop persisting until reloaded).
    pub async fn save(&self, key: &str, snapshot: &PersistedQueueState) {
        let value = match serde_json::to_value(snapshot) {
            Ok(value) => value,
            Err(e) => {
                (self.on_error)(StoreErrorKind::Save, &e.into());
                return;
            }
        };

        if let Err(e) = self.kv.set(key, value).await {
            if e.is_context_invalidated() {
                debug!("Snapshot save suppressed, context invalidated");
            } else {
                (self.on_error)(StoreErrorKind::Save, &e);
            }
        }
    }

    /// Load the snapshot for a conversation key.
    ///
    /// Falls back to the legacy global key exactly once per store: when
    /// found there, the value is copied forward to `key` and the legacy
    /// key is deleted, so later loads - including ones racing this call -
    /// never see it again.
    pub async fn load(&self, key: &str) -> Option<PersistedQueueState> {
        match self.kv.get(key).await {
            Ok(Some(value)) => return self.decode(value, StoreErrorKind::Load),
            Ok(None) => {}
            Err(e) => {
                (self.on_error)(StoreErrorKind::Load, &e);
                return None;
            }
        }

        let mut checked = self.legacy_checked.lock().await;
        if *checked {
            return None;
        }
        *checked = true;
        self.migrate_legacy(key).await
    }

    /// Remove the snapshot for a conversation key (conversation reset).
    pub async fn clear(&self, key: &str) {
        if let Err(e) = self.kv.remove(key).await {
            if !e.is_context_invalidated() {
                (self.on_error)(StoreErrorKind::Save, &e);
            }
        }
    }

    async fn migrate_legacy(&self, key: &str) -> Option<PersistedQueueState> {
        let value = match self.kv.get(LEGACY_QUEUE_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                (self.on_error)(StoreErrorKind::Migrate, &e);
                return None;
            }
        };

        let snapshot = self.decode(value.clone(), StoreErrorKind::Migrate)?;

        // Copy forward, then delete the legacy slot. Failures are reported
        // but the decoded value is still returned: the in-memory queue is
        // authoritative and the next successful save re-establishes it.
        if let Err(e) = self.kv.set(key, value).await {
            (self.on_error)(StoreErrorKind::Migrate, &e);
        }
        if let Err(e) = self.kv.remove(LEGACY_QUEUE_KEY).await {
            (self.on_error)(StoreErrorKind::Migrate, &e);
        }

        info!("Migrated legacy queue snapshot to {}", key);
        Some(snapshot)
    }

    fn decode(&self, value: serde_json::Value, kind: StoreErrorKind) -> Option<PersistedQueueState> {
        match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                (self.on_error)(kind, &e.into());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use chatqueue_protocols::QueueEntry;

    use crate::kv::MemoryKvStore;

    fn snapshot_with(texts: &[&str]) -> PersistedQueueState {
        PersistedQueueState {
            running: true,
            queue: texts.iter().map(|t| QueueEntry::new(*t)).collect(),
            collapsed: false,
            paused: false,
            pause_reason: None,
            paused_at: None,
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = SnapshotStore::new(kv);

        let snapshot = snapshot_with(&["draw a cat", "now make it blue"]);
        store.save("cq:v2:host/c/1", &snapshot).await;

        let loaded = store.load("cq:v2:host/c/1").await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_legacy_migration_exactly_once() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set(
            LEGACY_QUEUE_KEY,
            serde_json::to_value(snapshot_with(&["legacy"])).unwrap(),
        )
        .await
        .unwrap();

        let store = SnapshotStore::new(kv.clone());

        // First load migrates and deletes the legacy key.
        let loaded = store.load("cq:v2:host/c/1").await.unwrap();
        assert_eq!(loaded.queue[0].text, "legacy");
        assert!(kv.get(LEGACY_QUEUE_KEY).await.unwrap().is_none());
        assert!(kv.get("cq:v2:host/c/1").await.unwrap().is_some());

        // Even if a legacy value reappears, a load for a different
        // conversation does not consult it again.
        kv.set(LEGACY_QUEUE_KEY, serde_json::json!({"bogus": true}))
            .await
            .unwrap();
        assert!(store.load("cq:v2:host/c/2").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = SnapshotStore::new(kv.clone());

        store.save("k", &snapshot_with(&["x"])).await;
        store.clear("k").await;
        assert!(kv.get("k").await.unwrap().is_none());
    }

    /// KV store whose writes always fail with a fixed message.
    struct FailingWrites(&'static str);

    #[async_trait]
    impl KvStore for FailingWrites {
        async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Backend(self.0.to_string()))
        }
        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_context_invalidated_saves_are_suppressed() {
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = reported.clone();
        let store = SnapshotStore::with_error_callback(
            Arc::new(FailingWrites("Extension context invalidated.")),
            Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.save("k", &snapshot_with(&["x"])).await;
        assert_eq!(reported.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_save_errors_reach_callback() {
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = reported.clone();
        let store = SnapshotStore::with_error_callback(
            Arc::new(FailingWrites("disk full")),
            Arc::new(move |kind, _| {
                assert_eq!(kind, StoreErrorKind::Save);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.save("k", &snapshot_with(&["x"])).await;
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reports_load_error() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set("k", serde_json::json!("not an object")).await.unwrap();

        let reported = Arc::new(AtomicUsize::new(0));
        let counter = reported.clone();
        let store = SnapshotStore::with_error_callback(
            kv,
            Arc::new(move |kind, _| {
                assert_eq!(kind, StoreErrorKind::Load);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(store.load("k").await.is_none());
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }
}
