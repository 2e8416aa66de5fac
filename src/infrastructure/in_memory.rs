use crate::domain::ports::SnapshotStore;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory snapshot store.
///
/// Uses `Arc<RwLock<HashMap<String, Value>>>` so clones share the same data.
/// Suitable for tests and for hosts that only need to survive a screen
/// rotation, not a process restart.
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new, empty in-memory snapshot store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, key: &str, snapshot: Value) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_snapshot_store() {
        let store = InMemorySnapshotStore::new();
        store.save("payment", json!({ "state": "started" })).await.unwrap();

        let retrieved = store.load("payment").await.unwrap().unwrap();
        assert_eq!(retrieved["state"], "started");
        assert!(store.load("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_snapshot_store_overwrite_and_remove() {
        let store = InMemorySnapshotStore::new();
        store.save("k", json!(1)).await.unwrap();
        store.save("k", json!(2)).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.load("k").await.unwrap(), Some(json!(2)));

        store.remove("k").await.unwrap();
        assert!(store.is_empty().await);
        store.remove("k").await.unwrap();
    }
}
