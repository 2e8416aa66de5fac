//! Typed save/load on top of a [`SnapshotStore`].

use crate::domain::ports::SnapshotStore;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub async fn save_snapshot<T: Serialize>(
    store: &dyn SnapshotStore,
    key: &str,
    snapshot: &T,
) -> Result<()> {
    let value = serde_json::to_value(snapshot)?;
    store.save(key, value).await
}

/// Loads a snapshot; a stored value that no longer parses is a `Format` error.
pub async fn load_snapshot<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    key: &str,
) -> Result<Option<T>> {
    match store.load(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| PaymentError::Format(format!("snapshot `{key}`: {e}"))),
        None => Ok(None),
    }
}
